//! Selected file handles
//!
//! Only the name and size of a selected file are ever used; no audio bytes
//! are read.

use remix_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// A file chosen by the user for one of the two track slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFile {
    /// File name as selected (e.g. "track.mp3")
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported by the browser, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl TrackFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: None,
        }
    }

    /// Reject blank names and non-audio MIME types
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("File name must not be empty".to_string()));
        }

        if let Some(mime) = &self.mime_type {
            if !mime.trim().to_ascii_lowercase().starts_with("audio/") {
                return Err(Error::InvalidInput(format!(
                    "Unsupported file type '{}': only audio files can be analyzed",
                    mime
                )));
            }
        }

        Ok(())
    }
}
