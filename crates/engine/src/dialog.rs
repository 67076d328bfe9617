use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use triage_triggers::ProblemTypeKey;

static CONV_FILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"conv_([A-Z]+-[0-9]+)_").expect("valid dialog id pattern"));

/// A client message that fired at least one trigger of a problem type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedMessage {
    /// Transcript file the message came from
    pub transcript: String,
    /// Position of the message inside its transcript
    pub index: usize,
    pub author_id: String,
    pub text: String,
    /// Distinct lower-cased triggers, sorted
    pub triggers: Vec<String>,
}

/// Classification result for one dialog folder.
///
/// Only built when at least one problem type matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblematicDialog {
    pub folder_name: String,
    pub dialog_id: String,
    /// Sorted by key
    pub matched_types: Vec<ProblemTypeKey>,
    /// Every regular file of the folder, sorted by name
    pub files: Vec<String>,
    /// Case-insensitively unique, first-seen order
    pub triggers: Vec<String>,
    pub evidence: BTreeMap<ProblemTypeKey, Vec<MatchedMessage>>,
}

impl ProblematicDialog {
    pub fn has_type(&self, key: &str) -> bool {
        self.matched_types.iter().any(|matched| matched == key)
    }
}

/// Dialog id embedded in a transcript file name (`conv_AAA-11314_chat.json`)
pub fn extract_dialog_id(file_name: &str) -> Option<&str> {
    CONV_FILE_PATTERN
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Append `candidate` unless an equal trigger (ignoring case) is already present.
/// Returns whether it was appended.
pub fn push_unique_trigger(triggers: &mut Vec<String>, candidate: &str) -> bool {
    let folded = candidate.to_lowercase();
    if triggers.iter().any(|seen| seen.to_lowercase() == folded) {
        return false;
    }
    triggers.push(candidate.to_string());
    true
}
