//! Durable list-scoped snapshot storage.
//!
//! The cache is the fallback the engine reaches for when the remote store is
//! unavailable. Its contract is deliberately narrow: reads answer "the last
//! written snapshot, or nothing", and medium failures are logged and reported
//! as absence rather than bubbled up, since a missing cache entry and an
//! unreadable one degrade the same way.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tally_engine::{cache_key, CachedList, ListId, Timestamp, Todo};
use tracing::{debug, warn};

const LAST_ACTIVE_FILE: &str = "last_active_list";

/// Durable fallback storage for list snapshots.
pub trait TodoCache: Send + Sync {
    /// The last snapshot written for `list_id`, or `None`.
    fn read(&self, list_id: &str) -> Option<Vec<Todo>>;

    /// Overwrite the snapshot for `list_id`. Last writer wins.
    fn write(&self, list_id: &str, todos: &[Todo], saved_at: Timestamp);

    /// The list id recorded as last active, if any.
    fn read_last_active(&self) -> Option<ListId>;

    /// Record `list_id` as the last active list.
    fn write_last_active(&self, list_id: &str);
}

/// [`TodoCache`] keeping one JSON document per list under a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open the cache at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, list_id: &str) -> PathBuf {
        // List ids come from the server as UUIDs; separators are replaced so
        // an odd id can never name a path outside the cache directory.
        let safe = list_id.replace(['/', '\\'], "_");
        self.dir.join(format!("{}.json", cache_key(&safe)))
    }
}

impl TodoCache for FileCache {
    fn read(&self, list_id: &str) -> Option<Vec<Todo>> {
        let path = self.entry_path(list_id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(list_id, error = %e, "failed to read cache entry");
                return None;
            }
        };

        match CachedList::from_json(&json) {
            Ok(cached) => {
                debug!(list_id, todos = cached.todos.len(), "cache hit");
                Some(cached.todos)
            }
            Err(e) => {
                warn!(list_id, error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    fn write(&self, list_id: &str, todos: &[Todo], saved_at: Timestamp) {
        let cached = CachedList::new(list_id, todos.to_vec(), saved_at);
        let json = match cached.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(list_id, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = fs::write(self.entry_path(list_id), json) {
            warn!(list_id, error = %e, "failed to write cache entry");
        } else {
            debug!(list_id, todos = todos.len(), "cache entry written");
        }
    }

    fn read_last_active(&self) -> Option<ListId> {
        match fs::read_to_string(self.dir.join(LAST_ACTIVE_FILE)) {
            Ok(id) => {
                let id = id.trim().to_string();
                (!id.is_empty()).then_some(id)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, "failed to read last active marker");
                None
            }
        }
    }

    fn write_last_active(&self, list_id: &str) {
        if let Err(e) = fs::write(self.dir.join(LAST_ACTIVE_FILE), list_id) {
            warn!(list_id, error = %e, "failed to write last active marker");
        }
    }
}
