use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// One chat message as stored in a transcript file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "user_id", default)]
    pub author_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Message {
    /// Whether the author id carries one of the client prefixes
    pub fn is_client_authored(&self, client_prefixes: &[String]) -> bool {
        client_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && self.author_id.starts_with(prefix.as_str()))
    }
}

/// Parsed `*_chat.json` transcript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Transcript {
    pub fn from_slice(path: &Path, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| TriageError::Transcript {
            path: path.to_path_buf(),
            source,
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_slice(path, &bytes)
    }
}
