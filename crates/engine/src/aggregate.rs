use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use triage_triggers::ProblemTypeKey;

use crate::dialog::ProblematicDialog;
use crate::error::Result;
use crate::orchestrator::{DialogStream, DispatchReport};

/// Number of triggers shown in rankings
pub const TOP_TRIGGERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub key: ProblemTypeKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCount {
    pub trigger: String,
    pub count: usize,
}

/// Frozen result of a classification run. Only readable once produced.
#[derive(Debug, Clone, Default)]
pub struct AggregateState {
    counts: BTreeMap<ProblemTypeKey, usize>,
    dialogs_by_type: BTreeMap<ProblemTypeKey, Vec<Arc<ProblematicDialog>>>,
    trigger_frequency: BTreeMap<String, usize>,
    dialogs: Vec<Arc<ProblematicDialog>>,
    dispatch: DispatchReport,
}

impl AggregateState {
    pub fn counts(&self) -> &BTreeMap<ProblemTypeKey, usize> {
        &self.counts
    }

    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Dialogs of one type in arrival order
    pub fn dialogs_of(&self, key: &str) -> &[Arc<ProblematicDialog>] {
        self.dialogs_by_type
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Folder names of one type, sorted
    pub fn folder_names_of(&self, key: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .dialogs_of(key)
            .iter()
            .map(|dialog| dialog.folder_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Every problematic dialog, sorted by folder name
    pub fn dialogs(&self) -> Vec<&ProblematicDialog> {
        let mut dialogs: Vec<&ProblematicDialog> =
            self.dialogs.iter().map(|dialog| dialog.as_ref()).collect();
        dialogs.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
        dialogs
    }

    /// Triggered type keys, sorted
    pub fn type_keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Case-folded trigger → number of dialogs it fired in
    pub fn trigger_frequency(&self) -> &BTreeMap<String, usize> {
        &self.trigger_frequency
    }

    /// Number of distinct problematic dialogs
    pub fn total_dialogs(&self) -> usize {
        self.dialogs.len()
    }

    /// Sum of per-type counts; exceeds [`Self::total_dialogs`] when dialogs carry several types
    pub fn total_assignments(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn folders_scanned(&self) -> usize {
        self.dispatch.folders
    }

    pub fn failed_tasks(&self) -> usize {
        self.dispatch.failed_tasks
    }

    /// Types by descending count; equal counts ordered by key
    pub fn ranked_types(&self) -> Vec<TypeCount> {
        let mut ranked: Vec<TypeCount> = self
            .counts
            .iter()
            .map(|(key, &count)| TypeCount {
                key: key.clone(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        ranked
    }

    /// Most frequent triggers; equal frequencies ordered by trigger text
    pub fn top_triggers(&self, limit: usize) -> Vec<TriggerCount> {
        let mut ranked: Vec<TriggerCount> = self
            .trigger_frequency
            .iter()
            .map(|(trigger, &count)| TriggerCount {
                trigger: trigger.clone(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.trigger.cmp(&b.trigger))
        });
        ranked.truncate(limit);
        ranked
    }
}

/// Single consumer of the classification stream
#[derive(Debug, Default)]
pub struct ResultAggregator {
    state: AggregateState,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, dialog: ProblematicDialog) {
        let dialog = Arc::new(dialog);
        for key in &dialog.matched_types {
            *self.state.counts.entry(key.clone()).or_insert(0) += 1;
            self.state
                .dialogs_by_type
                .entry(key.clone())
                .or_default()
                .push(Arc::clone(&dialog));
        }
        for trigger in &dialog.triggers {
            *self
                .state
                .trigger_frequency
                .entry(trigger.to_lowercase())
                .or_insert(0) += 1;
        }
        self.state.dialogs.push(dialog);
    }

    pub fn finish(mut self, dispatch: DispatchReport) -> AggregateState {
        self.state.dispatch = dispatch;
        self.state
    }

    /// Drain `stream` to the end and freeze the result
    pub async fn consume(mut self, mut stream: DialogStream) -> Result<AggregateState> {
        while let Some(dialog) = stream.recv().await {
            self.record(dialog);
        }
        let dispatch = stream.finish().await?;
        log::info!(
            "Aggregated {} problematic dialogs out of {} folders",
            self.state.dialogs.len(),
            dispatch.folders
        );
        Ok(self.finish(dispatch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dialog(folder: &str, types: &[&str], triggers: &[&str]) -> ProblematicDialog {
        ProblematicDialog {
            folder_name: folder.to_string(),
            dialog_id: folder.to_string(),
            matched_types: types.iter().map(|t| t.to_string()).collect(),
            files: vec![format!("conv_{folder}_chat.json")],
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            evidence: BTreeMap::new(),
        }
    }

    fn aggregate(dialogs: Vec<ProblematicDialog>) -> AggregateState {
        let mut aggregator = ResultAggregator::new();
        for dialog in dialogs {
            aggregator.record(dialog);
        }
        aggregator.finish(DispatchReport {
            folders: 10,
            failed_tasks: 0,
        })
    }

    #[test]
    fn dialog_lands_in_every_matched_type() {
        let state = aggregate(vec![
            dialog("AAA-1", &["complaint", "refund"], &["refund"]),
            dialog("BBB-2", &["refund"], &["money back"]),
        ]);

        assert_eq!(state.count("refund"), 2);
        assert_eq!(state.count("complaint"), 1);
        assert_eq!(state.count("delivery"), 0);
        assert_eq!(state.folder_names_of("refund"), vec!["AAA-1", "BBB-2"]);
        assert_eq!(state.folder_names_of("complaint"), vec!["AAA-1"]);
        assert!(state.dialogs_of("delivery").is_empty());
        assert_eq!(state.folders_scanned(), 10);
    }

    #[test]
    fn assignment_total_bounds_distinct_dialogs() {
        let multi = aggregate(vec![
            dialog("AAA-1", &["complaint", "refund"], &["refund"]),
            dialog("BBB-2", &["refund"], &["refund"]),
        ]);
        assert_eq!(multi.total_dialogs(), 2);
        assert_eq!(multi.total_assignments(), 3);

        let single = aggregate(vec![
            dialog("AAA-1", &["refund"], &["refund"]),
            dialog("BBB-2", &["delivery"], &["lost parcel"]),
        ]);
        assert_eq!(single.total_dialogs(), single.total_assignments());
    }

    #[test]
    fn trigger_frequency_is_case_folded_and_counted_per_dialog() {
        let state = aggregate(vec![
            dialog("AAA-1", &["complaint", "refund"], &["Refund"]),
            dialog("BBB-2", &["refund"], &["refund", "money back"]),
        ]);
        assert_eq!(state.trigger_frequency().get("refund"), Some(&2));
        assert_eq!(state.trigger_frequency().get("money back"), Some(&1));
        assert_eq!(state.trigger_frequency().get("Refund"), None);
    }

    #[test]
    fn type_ranking_breaks_ties_by_key() {
        let state = aggregate(vec![
            dialog("AAA-1", &["refund"], &["refund"]),
            dialog("BBB-2", &["delivery"], &["lost parcel"]),
            dialog("CCC-3", &["refund"], &["refund"]),
            dialog("DDD-4", &["complaint"], &["complaint"]),
        ]);
        let ranked: Vec<(String, usize)> = state
            .ranked_types()
            .into_iter()
            .map(|t| (t.key, t.count))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("refund".to_string(), 2),
                ("complaint".to_string(), 1),
                ("delivery".to_string(), 1),
            ]
        );
    }

    #[test]
    fn trigger_ranking_is_deterministic_and_limited() {
        let dialogs: Vec<ProblematicDialog> = (0..12)
            .map(|i| {
                let trigger = format!("t{i:02}");
                dialog(&format!("F-{i}"), &["refund"], &[trigger.as_str(), "refund"])
            })
            .collect();
        let state = aggregate(dialogs);

        let top = state.top_triggers(TOP_TRIGGERS);
        assert_eq!(top.len(), TOP_TRIGGERS);
        assert_eq!(
            top[0],
            TriggerCount {
                trigger: "refund".to_string(),
                count: 12
            }
        );
        let rest: Vec<&str> = top[1..].iter().map(|t| t.trigger.as_str()).collect();
        assert_eq!(
            rest,
            vec!["t00", "t01", "t02", "t03", "t04", "t05", "t06", "t07", "t08"]
        );
    }

    #[test]
    fn arrival_order_does_not_change_rankings() {
        let a = dialog("AAA-1", &["complaint", "refund"], &["refund"]);
        let b = dialog("BBB-2", &["delivery"], &["lost parcel"]);
        let c = dialog("CCC-3", &["complaint"], &["complaint"]);

        let forward = aggregate(vec![a.clone(), b.clone(), c.clone()]);
        let backward = aggregate(vec![c, b, a]);

        assert_eq!(forward.counts(), backward.counts());
        assert_eq!(forward.ranked_types(), backward.ranked_types());
        assert_eq!(
            forward.top_triggers(TOP_TRIGGERS),
            backward.top_triggers(TOP_TRIGGERS)
        );
        assert_eq!(
            forward.folder_names_of("complaint"),
            backward.folder_names_of("complaint")
        );
        assert_eq!(forward.dialogs(), backward.dialogs());
    }
}
