use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use triage_engine::{AggregateState, MatchedMessage, ProblematicDialog};
use triage_triggers::TriggerSet;

pub const TRIGGER_INFO_FILE: &str = "trigger_info.txt";
pub const REPORTS_DIR: &str = "reports";

/// Outcome of copying classified dialogs into the output tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub dialogs_written: usize,
    pub dialogs_failed: usize,
    pub files_copied: usize,
    pub files_failed: usize,
    pub reports_written: usize,
    pub reports_failed: usize,
}

#[derive(Serialize)]
struct DialogReport<'a> {
    dialog_id: &'a str,
    folder_name: &'a str,
    matched_types: Vec<TypeEvidence<'a>>,
    unique_triggers: &'a [String],
}

#[derive(Serialize)]
struct TypeEvidence<'a> {
    #[serde(rename = "type")]
    key: &'a str,
    type_name: &'a str,
    triggers: Vec<String>,
    messages: &'a [MatchedMessage],
}

/// Writes `<out>/<type>/<folder>/` copies and per-dialog evidence reports
pub struct MaterializationWriter<'a> {
    input_root: &'a Path,
    output_root: &'a Path,
    triggers: &'a TriggerSet,
    json_reports: bool,
}

impl<'a> MaterializationWriter<'a> {
    pub fn new(input_root: &'a Path, output_root: &'a Path, triggers: &'a TriggerSet) -> Self {
        Self {
            input_root,
            output_root,
            triggers,
            json_reports: true,
        }
    }

    pub fn with_json_reports(mut self, enabled: bool) -> Self {
        self.json_reports = enabled;
        self
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.output_root.join(REPORTS_DIR)
    }

    /// Create the output root and one directory per triggered type.
    pub fn prepare(&self, state: &AggregateState) -> Result<()> {
        fs::create_dir_all(self.output_root).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_root.display()
            )
        })?;
        for key in state.type_keys() {
            let dir = self.output_root.join(key);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create type directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Copy every dialog into each of its type directories. Failures are logged and counted.
    pub fn write(&self, state: &AggregateState) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        for key in state.type_keys() {
            let type_name = self.triggers.display_name(key);
            let mut dialogs: Vec<&ProblematicDialog> =
                state.dialogs_of(key).iter().map(|d| d.as_ref()).collect();
            dialogs.sort_by(|a, b| a.folder_name.cmp(&b.folder_name));
            for dialog in dialogs {
                self.write_dialog(key, type_name, dialog, &mut report);
            }
        }

        if self.json_reports && state.total_dialogs() > 0 {
            self.write_reports(state, &mut report);
        }

        log::info!(
            "Materialized {} dialog copies ({} files copied, {} failed)",
            report.dialogs_written,
            report.files_copied,
            report.files_failed
        );
        report
    }

    fn write_dialog(
        &self,
        key: &str,
        type_name: &str,
        dialog: &ProblematicDialog,
        report: &mut MaterializeReport,
    ) {
        let source = self.input_root.join(&dialog.folder_name);
        let target = self.output_root.join(key).join(&dialog.folder_name);
        if let Err(err) = fs::create_dir_all(&target) {
            log::error!("Failed to create {}: {err}", target.display());
            report.dialogs_failed += 1;
            return;
        }

        for file in &dialog.files {
            match fs::copy(source.join(file), target.join(file)) {
                Ok(_) => report.files_copied += 1,
                Err(err) => {
                    log::warn!(
                        "Failed to copy {} into {}: {err}",
                        source.join(file).display(),
                        target.display()
                    );
                    report.files_failed += 1;
                }
            }
        }

        let info_path = target.join(TRIGGER_INFO_FILE);
        if let Err(err) = fs::write(&info_path, render_trigger_info(dialog, type_name)) {
            log::warn!("Failed to write {}: {err}", info_path.display());
            report.files_failed += 1;
        }
        report.dialogs_written += 1;
    }

    fn write_reports(&self, state: &AggregateState, report: &mut MaterializeReport) {
        let dir = self.reports_dir();
        if let Err(err) = fs::create_dir_all(&dir) {
            log::error!("Failed to create {}: {err}", dir.display());
            report.reports_failed += state.total_dialogs();
            return;
        }

        for dialog in state.dialogs() {
            let path = dir.join(format!("{}.json", dialog.folder_name));
            let written = serde_json::to_vec_pretty(&self.dialog_report(dialog))
                .map_err(anyhow::Error::from)
                .and_then(|bytes| fs::write(&path, bytes).map_err(anyhow::Error::from));
            match written {
                Ok(()) => report.reports_written += 1,
                Err(err) => {
                    log::warn!("Failed to write report {}: {err:#}", path.display());
                    report.reports_failed += 1;
                }
            }
        }
    }

    fn dialog_report<'d>(&'d self, dialog: &'d ProblematicDialog) -> DialogReport<'d> {
        let matched_types = dialog
            .matched_types
            .iter()
            .map(|key| {
                let messages = dialog
                    .evidence
                    .get(key)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let mut triggers: Vec<String> = messages
                    .iter()
                    .flat_map(|message| message.triggers.iter().cloned())
                    .collect();
                triggers.sort();
                triggers.dedup();
                TypeEvidence {
                    key,
                    type_name: self.triggers.display_name(key),
                    triggers,
                    messages,
                }
            })
            .collect();

        DialogReport {
            dialog_id: &dialog.dialog_id,
            folder_name: &dialog.folder_name,
            matched_types,
            unique_triggers: &dialog.triggers,
        }
    }
}

/// Contents of `trigger_info.txt` for one dialog copy
pub fn render_trigger_info(dialog: &ProblematicDialog, type_name: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("Dialog ID: {}\n", dialog.dialog_id));
    out.push_str(&format!("Problem type: {type_name}\n"));
    out.push_str(&format!("Folder: {}\n", dialog.folder_name));
    out.push_str("\nTriggers found:\n");
    for trigger in &dialog.triggers {
        out.push_str(&format!("- {trigger}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::tempdir;
    use triage_engine::{DispatchReport, ResultAggregator};

    fn triggers() -> TriggerSet {
        let config = serde_json::json!({
            "schema_version": 1,
            "types": {
                "refund": { "name": "Refund requests", "triggers": ["refund"] },
                "complaint": { "triggers": ["terrible"] }
            }
        });
        TriggerSet::from_bytes(config.to_string().as_bytes()).unwrap()
    }

    fn dialog(folder: &str, types: &[&str]) -> ProblematicDialog {
        let message = MatchedMessage {
            transcript: format!("conv_{folder}_chat.json"),
            index: 0,
            author_id: "user_1".to_string(),
            text: "Terrible service, I want a Refund".to_string(),
            triggers: vec!["refund".to_string()],
        };
        let evidence: BTreeMap<String, Vec<MatchedMessage>> = types
            .iter()
            .map(|key| (key.to_string(), vec![message.clone()]))
            .collect();
        ProblematicDialog {
            folder_name: folder.to_string(),
            dialog_id: folder.to_string(),
            matched_types: types.iter().map(|t| t.to_string()).collect(),
            files: vec![
                format!("conv_{folder}_chat.json"),
                format!("conv_{folder}_info.json"),
            ],
            triggers: vec!["Refund".to_string(), "terrible".to_string()],
            evidence,
        }
    }

    fn seed_input(root: &Path, folder: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("conv_{folder}_chat.json")), b"{\"messages\":[]}").unwrap();
        fs::write(dir.join(format!("conv_{folder}_info.json")), b"{}").unwrap();
    }

    fn state_of(dialogs: Vec<ProblematicDialog>) -> AggregateState {
        let mut aggregator = ResultAggregator::new();
        for dialog in dialogs {
            aggregator.record(dialog);
        }
        aggregator.finish(DispatchReport {
            folders: 3,
            failed_tasks: 0,
        })
    }

    #[test]
    fn trigger_info_lists_dialog_and_triggers() {
        let info = render_trigger_info(&dialog("AAA-1", &["refund"]), "Refund requests");
        assert_eq!(
            info,
            "Dialog ID: AAA-1\nProblem type: Refund requests\nFolder: AAA-1\n\nTriggers found:\n- Refund\n- terrible\n"
        );
    }

    #[test]
    fn copies_dialog_into_every_type_directory() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        seed_input(input.path(), "AAA-1");
        let state = state_of(vec![dialog("AAA-1", &["complaint", "refund"])]);
        let triggers = triggers();

        let writer = MaterializationWriter::new(input.path(), output.path(), &triggers);
        writer.prepare(&state).unwrap();
        let report = writer.write(&state);

        assert_eq!(report.dialogs_written, 2);
        assert_eq!(report.files_copied, 4);
        assert_eq!(report.files_failed, 0);
        assert_eq!(report.reports_written, 1);
        for key in ["complaint", "refund"] {
            let dir = output.path().join(key).join("AAA-1");
            assert!(dir.join("conv_AAA-1_chat.json").is_file());
            assert!(dir.join("conv_AAA-1_info.json").is_file());
            assert!(dir.join(TRIGGER_INFO_FILE).is_file());
        }
        let info = fs::read_to_string(
            output
                .path()
                .join("complaint")
                .join("AAA-1")
                .join(TRIGGER_INFO_FILE),
        )
        .unwrap();
        assert!(info.contains("Problem type: complaint"), "{info}");
    }

    #[test]
    fn missing_source_file_is_counted_not_fatal() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        seed_input(input.path(), "AAA-1");
        fs::remove_file(input.path().join("AAA-1").join("conv_AAA-1_info.json")).unwrap();
        let state = state_of(vec![dialog("AAA-1", &["refund"])]);
        let triggers = triggers();

        let writer = MaterializationWriter::new(input.path(), output.path(), &triggers);
        writer.prepare(&state).unwrap();
        let report = writer.write(&state);

        assert_eq!(report.files_copied, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.dialogs_written, 1);
        assert!(output
            .path()
            .join("refund")
            .join("AAA-1")
            .join(TRIGGER_INFO_FILE)
            .is_file());
    }

    #[test]
    fn json_report_carries_evidence_per_type() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        seed_input(input.path(), "AAA-1");
        let state = state_of(vec![dialog("AAA-1", &["refund"])]);
        let triggers = triggers();

        let writer = MaterializationWriter::new(input.path(), output.path(), &triggers);
        writer.prepare(&state).unwrap();
        writer.write(&state);

        let raw = fs::read_to_string(output.path().join(REPORTS_DIR).join("AAA-1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["dialog_id"], "AAA-1");
        assert_eq!(value["matched_types"][0]["type"], "refund");
        assert_eq!(value["matched_types"][0]["type_name"], "Refund requests");
        assert_eq!(
            value["matched_types"][0]["triggers"],
            serde_json::json!(["refund"])
        );
        assert_eq!(value["matched_types"][0]["messages"][0]["author_id"], "user_1");
        assert_eq!(
            value["unique_triggers"],
            serde_json::json!(["Refund", "terrible"])
        );
    }

    #[test]
    fn json_reports_can_be_disabled() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        seed_input(input.path(), "AAA-1");
        let state = state_of(vec![dialog("AAA-1", &["refund"])]);
        let triggers = triggers();

        let writer = MaterializationWriter::new(input.path(), output.path(), &triggers)
            .with_json_reports(false);
        writer.prepare(&state).unwrap();
        let report = writer.write(&state);

        assert_eq!(report.reports_written, 0);
        assert!(!output.path().join(REPORTS_DIR).exists());
    }
}
