//! Channel credentials and the lookup port the resolver reads them through

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channel to post into and the bot token allowed to post there
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCredential {
    #[serde(rename = "chid")]
    pub channel_id: String,
    pub token: String,
}

impl ChannelCredential {
    pub fn new(channel_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            token: token.into(),
        }
    }
}

// Tokens end up in logs far too easily; keep them out of Debug output
impl fmt::Debug for ChannelCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCredential")
            .field("channel_id", &self.channel_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("failed to read credential file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credential file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where channel credentials come from, keyed by mailbox local-part.
///
/// Implementations decide about caching; the resolver calls `get` once per
/// message and never holds on to the result.
pub trait CredentialLookup: Send + Sync {
    fn get(&self, local_part: &str) -> Result<Option<ChannelCredential>, LookupError>;
}

/// A fixed mapping, mostly useful for tests and embedding
pub type StaticLookup = HashMap<String, ChannelCredential>;

impl CredentialLookup for StaticLookup {
    fn get(&self, local_part: &str) -> Result<Option<ChannelCredential>, LookupError> {
        Ok(HashMap::get(self, local_part).cloned())
    }
}

/// JSON document on disk, re-read on every lookup.
///
/// ```json
/// { "alerts": { "chid": "123456789", "token": "bot-token" } }
/// ```
///
/// Edits to the file apply to the next message without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileLookup {
    path: PathBuf,
}

impl JsonFileLookup {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read and parse the whole document
    pub fn load(&self) -> Result<HashMap<String, ChannelCredential>, LookupError> {
        let text = fs::read_to_string(&self.path).map_err(|source| LookupError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LookupError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl CredentialLookup for JsonFileLookup {
    fn get(&self, local_part: &str) -> Result<Option<ChannelCredential>, LookupError> {
        Ok(self.load()?.remove(local_part))
    }
}
