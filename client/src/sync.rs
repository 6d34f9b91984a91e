//! The sync service: drives a [`ListSession`] against real collaborators.
//!
//! The service is a single task owning the session. Commands arrive on a
//! channel, remote calls run as spawned tasks, and their completions come
//! back on a second channel tagged with the list they were issued for, so a
//! result that outlives a list switch is recognized as stale by the session
//! and discarded. Every applied transition persists the collection to the
//! cache and publishes a fresh snapshot on a watch channel.

use crate::cache::TodoCache;
use crate::error::ServiceError;
use crate::remote::RemoteStore;
use std::sync::Arc;
use tally_engine::{
    Effect, ListId, ListSession, LocalId, Outcome, RemoteId, Result as EngineResult, Timestamp,
    Todo, TodoId, TodoList, TodoSnapshot,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands accepted by the service.
#[derive(Debug)]
enum Command {
    Add { title: String },
    Toggle { id: TodoId },
    Delete { id: TodoId },
    Flush,
    Barrier { reply: oneshot::Sender<()> },
}

/// Completion of a spawned remote call, tagged with its originating list.
#[derive(Debug)]
enum Completion {
    Load {
        list_id: ListId,
        result: EngineResult<Vec<Todo>>,
    },
    Create {
        list_id: ListId,
        local_id: LocalId,
        result: EngineResult<Todo>,
    },
    Update {
        list_id: ListId,
        id: RemoteId,
        result: EngineResult<()>,
    },
    Delete {
        list_id: ListId,
        id: RemoteId,
        result: EngineResult<()>,
    },
}

/// Cloneable handle to a running [`SyncService`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<TodoSnapshot>,
    in_flight: watch::Receiver<usize>,
}

impl SyncHandle {
    /// The latest published snapshot.
    pub fn snapshot(&self) -> TodoSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<TodoSnapshot> {
        self.snapshots.clone()
    }

    /// Add a todo optimistically.
    pub fn add(&self, title: impl Into<String>) -> Result<(), ServiceError> {
        self.send(Command::Add {
            title: title.into(),
        })
    }

    /// Flip a todo's completed flag optimistically.
    pub fn toggle(&self, id: TodoId) -> Result<(), ServiceError> {
        self.send(Command::Toggle { id })
    }

    /// Remove a todo optimistically.
    pub fn delete(&self, id: TodoId) -> Result<(), ServiceError> {
        self.send(Command::Delete { id })
    }

    /// Retry every queued pending change.
    pub fn flush(&self) -> Result<(), ServiceError> {
        self.send(Command::Flush)
    }

    /// Wait until every command sent so far and every remote call it spawned
    /// has been reconciled into the session.
    pub async fn settled(&self) -> Result<(), ServiceError> {
        let (reply, ack) = oneshot::channel();
        self.send(Command::Barrier { reply })?;
        ack.await.map_err(|_| ServiceError::Closed)?;

        let mut in_flight = self.in_flight.clone();
        loop {
            if *in_flight.borrow_and_update() == 0 {
                return Ok(());
            }
            in_flight.changed().await.map_err(|_| ServiceError::Closed)?;
        }
    }

    fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands.send(command).map_err(|_| ServiceError::Closed)
    }
}

/// Owns the [`ListSession`] and reconciles it with the remote store, the
/// cache, and the current-list context.
pub struct SyncService {
    session: ListSession,
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn TodoCache>,
    lists: watch::Receiver<Option<TodoList>>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    snapshots: watch::Sender<TodoSnapshot>,
    in_flight: usize,
    in_flight_tx: watch::Sender<usize>,
}

impl SyncService {
    /// Spawn the service task. It runs until the list context is dropped.
    pub fn spawn(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn TodoCache>,
        lists: watch::Receiver<Option<TodoList>>,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(TodoSnapshot::default());
        let (in_flight_tx, in_flight_rx) = watch::channel(0);

        let handle = SyncHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
            in_flight: in_flight_rx,
        };
        let service = SyncService {
            session: ListSession::new(),
            remote,
            cache,
            lists,
            commands: commands_rx,
            completions: completions_rx,
            completions_tx,
            snapshots: snapshots_tx,
            in_flight: 0,
            in_flight_tx,
        };

        let join = tokio::spawn(service.run());
        (handle, join)
    }

    async fn run(mut self) {
        // A list selected before the service started is already the watch
        // value and would never fire `changed`, so sync once up front.
        self.sync_current_list();

        loop {
            // Biased: a pending list switch is observed before any queued
            // command, so commands always run against the list that was
            // current when they could first be seen.
            tokio::select! {
                biased;
                changed = self.lists.changed() => match changed {
                    Ok(()) => self.sync_current_list(),
                    Err(_) => break,
                },
                Some(command) = self.commands.recv() => self.handle_command(command),
                Some(completion) = self.completions.recv() => self.handle_completion(completion),
            }
        }

        info!("sync service stopped");
    }

    fn sync_current_list(&mut self) {
        let list = self.lists.borrow_and_update().clone();
        let Some(list) = list else { return };
        debug!(list_id = %list.id, "loading current list");
        let outcome = self.session.begin_load(list.id);
        self.settle(outcome);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Add { title } => {
                let outcome = self.session.add_todo(title, now_ms());
                self.settle(outcome);
            }
            Command::Toggle { id } => {
                let outcome = self.session.toggle_todo(id);
                self.settle(outcome);
            }
            Command::Delete { id } => {
                let outcome = self.session.delete_todo(id);
                self.settle(outcome);
            }
            Command::Flush => {
                let effects = self.session.flush_pending();
                if !effects.is_empty() {
                    info!(count = effects.len(), "retrying pending changes");
                }
                for effect in effects {
                    self.execute(effect);
                }
            }
            Command::Barrier { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let outcome = match completion {
            Completion::Load { list_id, result } => {
                let fallback = match &result {
                    Ok(_) => None,
                    Err(error) => {
                        warn!(%list_id, %error, "load failed, falling back to cache");
                        self.cache.read(&list_id)
                    }
                };
                self.session.complete_load(&list_id, result, fallback)
            }
            Completion::Create {
                list_id,
                local_id,
                result,
            } => {
                if let Err(error) = &result {
                    warn!(%list_id, local_id, %error, "create failed, queuing retry");
                }
                self.session.complete_create(&list_id, local_id, result)
            }
            Completion::Update {
                list_id,
                id,
                result,
            } => {
                if let Err(error) = &result {
                    warn!(%list_id, id, %error, "update failed, queuing retry");
                }
                self.session.complete_update(&list_id, id, result)
            }
            Completion::Delete {
                list_id,
                id,
                result,
            } => {
                if let Err(error) = &result {
                    warn!(%list_id, id, %error, "delete failed, rolling back");
                }
                self.session.complete_delete(&list_id, id, result)
            }
        };

        // Follow-up effects must be counted before this call is retired so
        // `settled` never observes a spurious zero.
        self.settle(outcome);
        self.finish_call();
    }

    /// Act on a transition outcome: persist and publish applied state, then
    /// issue whatever effect the session asked for.
    fn settle(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Applied { effect } => {
                self.persist();
                self.publish();
                if let Some(effect) = effect {
                    self.execute(effect);
                }
            }
            Outcome::FollowUp { effect } => self.execute(effect),
            Outcome::Skipped { reason } => debug!(?reason, "transition skipped"),
        }
    }

    fn persist(&self) {
        // Skip while a load is in flight: the collection was just cleared
        // for the incoming list, and the previous snapshot may still be
        // needed as that load's fallback.
        if self.session.loading() {
            return;
        }
        if let Some(list_id) = self.session.current_list() {
            self.cache.write(list_id, self.session.todos(), now_ms());
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    /// Run an effect as a spawned remote call, tagging its completion with
    /// the list the session holds right now.
    fn execute(&mut self, effect: Effect) {
        let Some(list_id) = self.session.current_list().map(str::to_owned) else {
            warn!(?effect, "dropping effect, no list is current");
            return;
        };
        let remote = Arc::clone(&self.remote);
        let tx = self.completions_tx.clone();
        self.start_call();

        match effect {
            Effect::Load { list_id } => {
                tokio::spawn(async move {
                    let result = remote.get_todos(&list_id).await;
                    let _ = tx.send(Completion::Load { list_id, result });
                });
            }
            Effect::Create {
                list_id,
                local_id,
                title,
            } => {
                tokio::spawn(async move {
                    let result = remote.create_todo(&list_id, &title).await;
                    let _ = tx.send(Completion::Create {
                        list_id,
                        local_id,
                        result,
                    });
                });
            }
            Effect::Update { id, completed } => {
                tokio::spawn(async move {
                    let result = remote.update_todo(id, completed).await.map(|_| ());
                    let _ = tx.send(Completion::Update {
                        list_id,
                        id,
                        result,
                    });
                });
            }
            Effect::Delete { id } => {
                tokio::spawn(async move {
                    let result = remote.delete_todo(id).await;
                    let _ = tx.send(Completion::Delete {
                        list_id,
                        id,
                        result,
                    });
                });
            }
        }
    }

    fn start_call(&mut self) {
        self.in_flight += 1;
        self.in_flight_tx.send_replace(self.in_flight);
    }

    fn finish_call(&mut self) {
        self.in_flight -= 1;
        self.in_flight_tx.send_replace(self.in_flight);
    }
}

fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as Timestamp
}
