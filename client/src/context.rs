//! Current-list tracking.

use crate::cache::TodoCache;
use crate::remote::RemoteStore;
use std::sync::Arc;
use tally_engine::{ListId, Result, TodoList};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Tracks which list is current and notifies subscribers when it changes.
///
/// A switch only takes effect once the list's metadata has been fetched, so
/// the recorded last-active id always names a list that resolved at least
/// once. A failed fetch leaves the previous selection in place.
pub struct ListContext {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn TodoCache>,
    current: watch::Sender<Option<TodoList>>,
}

impl ListContext {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn TodoCache>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            remote,
            cache,
            current,
        }
    }

    /// Subscribe to current-list changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<TodoList>> {
        self.current.subscribe()
    }

    /// Id of the current list, if one is selected.
    pub fn current_id(&self) -> Option<ListId> {
        self.current.borrow().as_ref().map(|list| list.id.clone())
    }

    /// Make `list_id` the current list.
    ///
    /// On success the new selection is published and persisted as last
    /// active. On failure the current selection is kept and the failure is
    /// only logged; subscribers see nothing.
    pub async fn set_current(&self, list_id: &str) {
        match self.remote.get_list(list_id).await {
            Ok(list) => {
                self.cache.write_last_active(&list.id);
                info!(list_id = %list.id, name = %list.name, "current list set");
                self.current.send_replace(Some(list));
            }
            Err(error) => {
                warn!(list_id, %error, "could not switch list, keeping current selection");
            }
        }
    }

    /// Re-select the list recorded as last active, if any.
    pub async fn restore_last_active(&self) {
        let Some(list_id) = self.cache.read_last_active() else {
            debug!("no last active list recorded");
            return;
        };
        debug!(%list_id, "restoring last active list");
        self.set_current(&list_id).await;
    }

    /// Create a list for `owner_guid`. The current selection is unchanged;
    /// callers switch explicitly if they want the new list.
    pub async fn create_list(&self, name: &str, owner_guid: &str) -> Result<TodoList> {
        let list = self.remote.create_list(name, owner_guid).await?;
        info!(list_id = %list.id, name = %list.name, "list created");
        Ok(list)
    }

    /// Enumerate the lists owned by `owner_guid`.
    pub async fn lists_for_owner(&self, owner_guid: &str) -> Result<Vec<TodoList>> {
        self.remote.lists_for_owner(owner_guid).await
    }
}
