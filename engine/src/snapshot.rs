//! Published state and durable cache documents.
//!
//! `TodoSnapshot` is the unit observers receive: collection, loading flag
//! and error message travel together so a consumer can never see a torn
//! intermediate state. `CachedList` is the durable form of a list's last
//! known todos, written to the local cache and read back only as a
//! degraded-mode fallback.

use crate::{Error, ListId, Result, Timestamp, Todo};
use serde::{Deserialize, Serialize};

/// Current cache document format version.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Atomically published view of the session state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoSnapshot {
    /// List the snapshot belongs to, none before the first load
    pub list_id: Option<ListId>,
    /// Ordered todo collection for the current list
    pub todos: Vec<Todo>,
    /// Whether a load is in flight
    pub loading: bool,
    /// Degraded-mode or failure warning, cleared by the next success
    pub error: Option<String>,
    /// Monotonic change counter, lets observers detect coalesced updates
    pub revision: u64,
}

impl TodoSnapshot {
    /// Whether the snapshot carries a warning message.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Find a todo by id.
    pub fn todo(&self, id: crate::TodoId) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }
}

/// Durable cache document for one list's todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedList {
    /// Format version for forward compatibility
    pub format_version: u32,
    /// List this document belongs to
    pub list_id: ListId,
    /// Ordered todos at write time, surrogate ids included
    pub todos: Vec<Todo>,
    /// When the document was written (milliseconds since epoch)
    pub saved_at: Timestamp,
}

impl CachedList {
    /// Create a document at the current format version.
    pub fn new(list_id: impl Into<ListId>, todos: Vec<Todo>, saved_at: Timestamp) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            list_id: list_id.into(),
            todos,
            saved_at,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidCacheEntry(e.to_string()))
    }

    /// Deserialize from JSON string, rejecting documents written by a newer
    /// format than this build understands.
    pub fn from_json(json: &str) -> Result<Self> {
        let cached: CachedList =
            serde_json::from_str(json).map_err(|e| Error::InvalidCacheEntry(e.to_string()))?;

        if cached.format_version > CACHE_FORMAT_VERSION {
            return Err(Error::CacheVersionMismatch {
                expected: CACHE_FORMAT_VERSION,
                actual: cached.format_version,
            });
        }

        Ok(cached)
    }
}

/// Storage key for a list's cache entry.
pub fn cache_key(list_id: &str) -> String {
    format!("todos_list_{}", list_id)
}
