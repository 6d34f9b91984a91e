//! The optimistic sync state machine for one list-viewing session.
//!
//! `ListSession` owns the in-memory todo collection for the current list and
//! every transition around it: optimistic applies, remote completions,
//! degraded-mode fallbacks and queued retries. It performs no I/O. Apply-side
//! methods describe the remote call to issue as an [`Effect`]; completion
//! methods take that call's result back, tagged with the list it was issued
//! for, so responses that outlive a list switch are discarded.
//!
//! Every mutation follows the same three-phase pattern: apply locally,
//! persist and publish (the caller's job on an `Applied` outcome), then
//! reconcile once the remote store answers. Failures never panic and never
//! surface raw: they degrade into a warning message plus retained optimistic
//! state, with the remote half parked in a [`PendingQueue`] until
//! [`ListSession::flush_pending`] is called.

use crate::pending::{PendingChange, PendingQueue};
use crate::{ListId, LocalId, RemoteId, Result, Timestamp, Todo, TodoId, TodoSnapshot};
use std::collections::HashSet;

/// Warning published when a load falls back to the local cache.
pub const LOAD_FALLBACK_WARNING: &str = "Failed to load todos from server, using local data";

/// Warning published when a create fails remotely.
pub const SAVE_FAILED_WARNING: &str = "Failed to save todo to server";

/// Warning published when an update fails remotely.
pub const UPDATE_FAILED_WARNING: &str = "Failed to update todo on server";

/// Warning published when a delete fails remotely.
pub const DELETE_FAILED_WARNING: &str = "Failed to delete todo from server";

/// A remote call the caller must issue on behalf of the session.
///
/// Each effect's completion is fed back through the matching `complete_*`
/// method, tagged with the list id the session held when the effect was
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the todo sequence for a list.
    Load { list_id: ListId },
    /// Create a row for an optimistic item still under its surrogate id.
    Create {
        list_id: ListId,
        local_id: LocalId,
        title: String,
    },
    /// Push a completed flag to an existing row.
    Update { id: RemoteId, completed: bool },
    /// Delete a row.
    Delete { id: RemoteId },
}

/// Why a transition changed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Mutation attempted before any list was selected.
    NoCurrentList,
    /// Target id not present in the collection.
    UnknownTodo { id: TodoId },
    /// Completion was tagged with a list that is no longer current.
    StaleList {
        current: Option<ListId>,
        got: ListId,
    },
    /// Completion arrived but state already reflected it.
    AlreadyCurrent,
}

/// Result of a session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// State changed. The caller should persist the collection, publish a
    /// fresh snapshot, and issue the attached effect if there is one.
    Applied { effect: Option<Effect> },
    /// State unchanged, but a remote call must still be issued.
    FollowUp { effect: Effect },
    /// Nothing to do.
    Skipped { reason: SkipReason },
}

impl Outcome {
    fn applied() -> Self {
        Outcome::Applied { effect: None }
    }

    fn applied_with(effect: Effect) -> Self {
        Outcome::Applied {
            effect: Some(effect),
        }
    }

    fn skipped(reason: SkipReason) -> Self {
        Outcome::Skipped { reason }
    }

    /// Whether the transition changed session state.
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    /// The remote call to issue, if any.
    pub fn effect(&self) -> Option<&Effect> {
        match self {
            Outcome::Applied { effect } => effect.as_ref(),
            Outcome::FollowUp { effect } => Some(effect),
            Outcome::Skipped { .. } => None,
        }
    }
}

/// A row removed optimistically, retained until the remote delete confirms.
#[derive(Debug, Clone)]
struct RetainedDelete {
    id: RemoteId,
    index: usize,
    todo: Todo,
}

/// Sync state for the current list.
///
/// One instance per viewing session; collaborators are passed in, nothing is
/// global. Timestamps come from the caller so behavior is reproducible.
#[derive(Debug, Clone)]
pub struct ListSession {
    list_id: Option<ListId>,
    todos: Vec<Todo>,
    loading: bool,
    error: Option<String>,
    revision: u64,
    next_local_id: LocalId,
    pending: PendingQueue,
    retained_deletes: Vec<RetainedDelete>,
    superseded_creates: HashSet<LocalId>,
}

impl Default for ListSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ListSession {
    /// Create a session with no current list.
    pub fn new() -> Self {
        Self {
            list_id: None,
            todos: Vec::new(),
            loading: false,
            error: None,
            revision: 0,
            next_local_id: 1,
            pending: PendingQueue::new(),
            retained_deletes: Vec::new(),
            superseded_creates: HashSet::new(),
        }
    }

    /// Id of the current list, if one is selected.
    pub fn current_list(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    /// The in-memory collection, in display order.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    /// Whether a load is in flight.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Current warning message, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Queued retries awaiting [`ListSession::flush_pending`].
    pub fn pending_changes(&self) -> &PendingQueue {
        &self.pending
    }

    /// Atomic view of the session for observers.
    pub fn snapshot(&self) -> TodoSnapshot {
        TodoSnapshot {
            list_id: self.list_id.clone(),
            todos: self.todos.clone(),
            loading: self.loading,
            error: self.error.clone(),
            revision: self.revision,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn stale_list(&self, got: &str) -> Outcome {
        Outcome::skipped(SkipReason::StaleList {
            current: self.list_id.clone(),
            got: got.to_string(),
        })
    }

    /// Start loading a list.
    ///
    /// Switching to a different list discards the previous collection and
    /// its queued retries; reloading the current list keeps the collection
    /// on screen until the result lands. Either way `loading` is raised and
    /// the error channel cleared.
    pub fn begin_load(&mut self, list_id: impl Into<ListId>) -> Outcome {
        let list_id = list_id.into();
        if self.list_id.as_ref() != Some(&list_id) {
            self.todos.clear();
            self.pending.clear();
            self.retained_deletes.clear();
            self.superseded_creates.clear();
            self.list_id = Some(list_id.clone());
        }
        self.loading = true;
        self.error = None;
        self.touch();
        Outcome::applied_with(Effect::Load { list_id })
    }

    /// Incorporate a load result.
    ///
    /// On success the collection becomes the returned sequence (empty is
    /// valid), with unconfirmed surrogate items re-appended since the remote
    /// store cannot know them yet. On failure the fallback snapshot (or an
    /// empty collection) is installed together with the degraded-mode
    /// warning. `loading` drops in both branches.
    pub fn complete_load(
        &mut self,
        list_id: &str,
        result: Result<Vec<Todo>>,
        fallback: Option<Vec<Todo>>,
    ) -> Outcome {
        if self.list_id.as_deref() != Some(list_id) {
            return self.stale_list(list_id);
        }

        match result {
            Ok(todos) => {
                let fresh = todos.into_iter().filter(|t| t.list_id == list_id).collect();
                self.todos = self.merge_unconfirmed(fresh);
                self.error = None;
            }
            Err(_) => {
                let base = fallback.unwrap_or_default();
                self.todos = self.merge_unconfirmed(base);
                self.error = Some(LOAD_FALLBACK_WARNING.to_string());
            }
        }
        self.loading = false;
        self.touch();
        Outcome::applied()
    }

    /// Re-append surrogate items onto a freshly loaded collection. They only
    /// exist on this client, so a reload must not drop them.
    fn merge_unconfirmed(&mut self, mut base: Vec<Todo>) -> Vec<Todo> {
        for todo in self.todos.drain(..) {
            if todo.id.is_local() && !base.iter().any(|t| t.id == todo.id) {
                base.push(todo);
            }
        }
        base
    }

    /// Append an optimistic todo under a fresh surrogate id.
    ///
    /// Skipped silently when no list is current. Clears the error channel
    /// so a new save attempt starts clean.
    pub fn add_todo(&mut self, title: impl Into<String>, now: Timestamp) -> Outcome {
        let Some(list_id) = self.list_id.clone() else {
            return Outcome::skipped(SkipReason::NoCurrentList);
        };

        let title = title.into();
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        self.todos
            .push(Todo::new_local(local_id, list_id.clone(), title.as_str(), now));
        self.error = None;
        self.touch();

        Outcome::applied_with(Effect::Create {
            list_id,
            local_id,
            title,
        })
    }

    /// Incorporate a create result for the surrogate `local_id`.
    ///
    /// Success substitutes the canonical todo in place, preserving collection
    /// order. A completed flag flipped while the create was in flight is kept
    /// and a follow-up update queued. Failure retains the optimistic item and
    /// queues a create retry.
    pub fn complete_create(
        &mut self,
        list_id: &str,
        local_id: LocalId,
        result: Result<Todo>,
    ) -> Outcome {
        if self.list_id.as_deref() != Some(list_id) {
            return self.stale_list(list_id);
        }

        if self.superseded_creates.remove(&local_id) {
            // The user deleted the item before the remote answered. A row
            // that got created anyway must be cleaned up remotely.
            return match result.ok().and_then(|t| t.id.as_remote()) {
                Some(remote_id) => Outcome::FollowUp {
                    effect: Effect::Delete { id: remote_id },
                },
                None => Outcome::skipped(SkipReason::UnknownTodo {
                    id: TodoId::Local(local_id),
                }),
            };
        }

        let Some(index) = self
            .todos
            .iter()
            .position(|t| t.id == TodoId::Local(local_id))
        else {
            return Outcome::skipped(SkipReason::UnknownTodo {
                id: TodoId::Local(local_id),
            });
        };

        match result {
            Ok(mut canonical) => {
                let completed = self.todos[index].completed;
                if canonical.completed != completed {
                    canonical.completed = completed;
                    if let Some(remote_id) = canonical.id.as_remote() {
                        self.pending.queue_update(remote_id, completed);
                    }
                }
                self.todos[index] = canonical;
                self.pending.cancel_create(local_id);
                self.error = None;
                self.touch();
                Outcome::applied()
            }
            Err(_) => {
                let title = self.todos[index].title.clone();
                self.pending.queue_create(local_id, title);
                self.error = Some(SAVE_FAILED_WARNING.to_string());
                self.touch();
                Outcome::applied()
            }
        }
    }

    /// Flip a todo's completed flag optimistically.
    ///
    /// Canonical items produce an update effect; surrogate items have no
    /// remote row yet, so their flip rides along with the pending create.
    pub fn toggle_todo(&mut self, id: TodoId) -> Outcome {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return Outcome::skipped(SkipReason::UnknownTodo { id });
        };

        todo.completed = !todo.completed;
        let completed = todo.completed;
        self.touch();

        match id {
            TodoId::Remote(remote_id) => Outcome::applied_with(Effect::Update {
                id: remote_id,
                completed,
            }),
            TodoId::Local(_) => Outcome::applied(),
        }
    }

    /// Incorporate an update result. The optimistic flip always stands;
    /// failure surfaces a warning and queues a retry with the collection's
    /// current value (latest flip wins).
    pub fn complete_update(&mut self, list_id: &str, id: RemoteId, result: Result<()>) -> Outcome {
        if self.list_id.as_deref() != Some(list_id) {
            return self.stale_list(list_id);
        }

        match result {
            Ok(()) => {
                if self.error.is_some() {
                    self.error = None;
                    self.touch();
                    Outcome::applied()
                } else {
                    Outcome::skipped(SkipReason::AlreadyCurrent)
                }
            }
            Err(_) => {
                if let Some(todo) = self.todos.iter().find(|t| t.id == TodoId::Remote(id)) {
                    self.pending.queue_update(id, todo.completed);
                }
                self.error = Some(UPDATE_FAILED_WARNING.to_string());
                self.touch();
                Outcome::applied()
            }
        }
    }

    /// Remove a todo optimistically.
    ///
    /// Canonical items are retained with their position for rollback and
    /// produce a delete effect. Deleting a surrogate item cancels its queued
    /// create, or marks an in-flight one superseded; no remote call is made.
    pub fn delete_todo(&mut self, id: TodoId) -> Outcome {
        let Some(index) = self.todos.iter().position(|t| t.id == id) else {
            return Outcome::skipped(SkipReason::UnknownTodo { id });
        };

        let todo = self.todos.remove(index);
        self.touch();

        match id {
            TodoId::Remote(remote_id) => {
                self.retained_deletes.push(RetainedDelete {
                    id: remote_id,
                    index,
                    todo,
                });
                Outcome::applied_with(Effect::Delete { id: remote_id })
            }
            TodoId::Local(local_id) => {
                if !self.pending.cancel_create(local_id) {
                    self.superseded_creates.insert(local_id);
                }
                Outcome::applied()
            }
        }
    }

    /// Incorporate a delete result.
    ///
    /// Success drops the retained copy and any queued update for the row.
    /// Failure rolls the deletion back, restoring the todo at its original
    /// index (clamped to the current length) and surfacing a warning.
    pub fn complete_delete(&mut self, list_id: &str, id: RemoteId, result: Result<()>) -> Outcome {
        if self.list_id.as_deref() != Some(list_id) {
            return self.stale_list(list_id);
        }

        let retained = self
            .retained_deletes
            .iter()
            .position(|r| r.id == id)
            .map(|i| self.retained_deletes.remove(i));

        match result {
            Ok(()) => {
                self.pending.cancel_update(id);
                if self.error.is_some() {
                    self.error = None;
                    self.touch();
                    Outcome::applied()
                } else {
                    Outcome::skipped(SkipReason::AlreadyCurrent)
                }
            }
            Err(_) => {
                let Some(retained) = retained else {
                    return Outcome::skipped(SkipReason::UnknownTodo {
                        id: TodoId::Remote(id),
                    });
                };
                // A reload may have resurrected the row already.
                if !self.todos.iter().any(|t| t.id == retained.todo.id) {
                    let index = retained.index.min(self.todos.len());
                    self.todos.insert(index, retained.todo);
                }
                self.error = Some(DELETE_FAILED_WARNING.to_string());
                self.touch();
                Outcome::applied()
            }
        }
    }

    /// Drain the queued retries into remote effects, in queue order.
    ///
    /// Failed retries re-queue through the normal completion paths, so
    /// calling this repeatedly converges without duplicating work.
    pub fn flush_pending(&mut self) -> Vec<Effect> {
        let Some(list_id) = self.list_id.clone() else {
            return Vec::new();
        };

        self.pending
            .drain()
            .into_iter()
            .filter_map(|change| match change {
                PendingChange::Create { local_id, title } => self
                    .todos
                    .iter()
                    .any(|t| t.id == TodoId::Local(local_id))
                    .then(|| Effect::Create {
                        list_id: list_id.clone(),
                        local_id,
                        title,
                    }),
                PendingChange::Update { id, completed } => {
                    Some(Effect::Update { id, completed })
                }
            })
            .collect()
    }
}
