use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use triage_triggers::{ProblemTypeKey, TriggerSet};

use crate::dialog::{extract_dialog_id, push_unique_trigger, MatchedMessage, ProblematicDialog};
use crate::transcript::{Message, Transcript};

pub const DEFAULT_TRANSCRIPT_MARKER: &str = "_chat.json";
pub const DEFAULT_CLIENT_PREFIX: &str = "user_";

/// What counts as a transcript and who counts as a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Name fragment identifying transcript files
    pub transcript_marker: String,
    /// Author id prefixes of client-authored messages
    pub client_prefixes: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            transcript_marker: DEFAULT_TRANSCRIPT_MARKER.to_string(),
            client_prefixes: vec![DEFAULT_CLIENT_PREFIX.to_string()],
        }
    }
}

impl ScanOptions {
    pub fn is_transcript(&self, file_name: &str) -> bool {
        file_name.contains(self.transcript_marker.as_str())
    }
}

#[derive(Default)]
struct FolderMatches {
    evidence: BTreeMap<ProblemTypeKey, Vec<MatchedMessage>>,
    triggers: Vec<String>,
}

/// Classifies a single dialog folder
pub struct DialogScanner {
    triggers: Arc<TriggerSet>,
    options: ScanOptions,
}

impl DialogScanner {
    pub fn new(triggers: Arc<TriggerSet>, options: ScanOptions) -> Self {
        Self { triggers, options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn triggers(&self) -> &TriggerSet {
        &self.triggers
    }

    /// Scan one folder. `None` when nothing matched or the folder could not be listed.
    pub async fn scan(&self, folder_path: &Path, folder_name: &str) -> Option<ProblematicDialog> {
        let files = match list_file_names(folder_path).await {
            Ok(files) => files,
            Err(err) => {
                log::warn!("Skipping folder {}: {err}", folder_path.display());
                return None;
            }
        };

        let mut dialog_id: Option<String> = None;
        let mut matches = FolderMatches::default();

        for file_name in files.iter().filter(|name| self.options.is_transcript(name)) {
            if dialog_id.is_none() {
                dialog_id = extract_dialog_id(file_name).map(str::to_string);
            }

            let path = folder_path.join(file_name);
            let transcript = match Transcript::load(&path).await {
                Ok(transcript) => transcript,
                Err(err) => {
                    log::warn!("Skipping transcript {}: {err}", path.display());
                    continue;
                }
            };
            self.scan_messages(file_name, &transcript.messages, &mut matches);
        }

        if matches.evidence.is_empty() {
            log::debug!("No triggers in {folder_name}");
            return None;
        }

        let dialog = ProblematicDialog {
            folder_name: folder_name.to_string(),
            dialog_id: dialog_id.unwrap_or_else(|| folder_name.to_string()),
            matched_types: matches.evidence.keys().cloned().collect(),
            files,
            triggers: matches.triggers,
            evidence: matches.evidence,
        };
        log::debug!(
            "{} matched {:?} via {} triggers",
            dialog.folder_name,
            dialog.matched_types,
            dialog.triggers.len()
        );
        Some(dialog)
    }

    fn scan_messages(&self, transcript_name: &str, messages: &[Message], acc: &mut FolderMatches) {
        for (index, message) in messages.iter().enumerate() {
            if !message.is_client_authored(&self.options.client_prefixes) {
                continue;
            }

            let text = message.text.to_lowercase();
            for key in self.triggers.keys() {
                let hits = self.triggers.find_matches(&text, key);
                if hits.is_empty() {
                    continue;
                }

                for hit in &hits {
                    push_unique_trigger(&mut acc.triggers, hit);
                }

                let mut distinct: Vec<String> = hits.iter().map(|hit| hit.to_lowercase()).collect();
                distinct.sort();
                distinct.dedup();

                acc.evidence
                    .entry(key.to_string())
                    .or_default()
                    .push(MatchedMessage {
                        transcript: transcript_name.to_string(),
                        index,
                        author_id: message.author_id.clone(),
                        text: message.text.clone(),
                        triggers: distinct,
                    });
            }
        }
    }
}

/// Regular files of `folder`, sorted by name
async fn list_file_names(folder: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_type = entry.file_type().await?;
        if !file_type.is_file() {
            log::debug!("Ignoring non-file entry {}", entry.path().display());
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
