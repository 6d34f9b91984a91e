//! Shared test doubles: a scriptable remote store and a recording cache.

#![allow(dead_code)]

pub mod api;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tally_client::{RemoteStore, TodoCache};
use tally_engine::{Error, ListId, RemoteId, Result, Timestamp, Todo, TodoId, TodoList};

/// In-memory remote store with per-operation failure switches and delays.
#[derive(Default)]
pub struct MockRemote {
    lists: Mutex<HashMap<ListId, TodoList>>,
    todos: Mutex<Vec<Todo>>,
    next_id: AtomicI64,
    fail_lists: AtomicBool,
    fail_todos: AtomicBool,
    fail_creates: AtomicBool,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
    todos_delay: Mutex<Option<Duration>>,
    creates_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// A store already holding one empty list.
    pub fn with_list(list_id: &str) -> Self {
        let remote = Self::new();
        remote.seed_list(list_id, "test list");
        remote
    }

    pub fn seed_list(&self, list_id: &str, name: &str) {
        let list = TodoList {
            id: list_id.to_string(),
            name: name.to_string(),
            owner_guid: "owner-1".to_string(),
            created_at: 1,
            updated_at: 1,
        };
        self.lists.lock().unwrap().insert(list.id.clone(), list);
    }

    pub fn seed_todo(&self, list_id: &str, title: &str, completed: bool) -> RemoteId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.todos.lock().unwrap().push(Todo {
            id: TodoId::Remote(id),
            list_id: list_id.to_string(),
            title: title.to_string(),
            completed,
            created_at: 1_000 + id as Timestamp,
        });
        id
    }

    /// The server-side rows for a list, in insertion order.
    pub fn rows(&self, list_id: &str) -> Vec<Todo> {
        self.todos
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.list_id == list_id)
            .cloned()
            .collect()
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_todos(&self, fail: bool) {
        self.fail_todos.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Delay every `get_todos` answer, so a load can be outrun by a switch.
    pub fn delay_todos(&self, delay: Duration) {
        *self.todos_delay.lock().unwrap() = Some(delay);
    }

    /// Delay every `create_todo` answer.
    pub fn delay_creates(&self, delay: Duration) {
        *self.creates_delay.lock().unwrap() = Some(delay);
    }

    /// Names of the operations attempted so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn gate(&self, switch: &AtomicBool, subject: &str) -> Result<()> {
        if switch.load(Ordering::SeqCst) {
            Err(Error::RemoteUnavailable(format!("simulated outage: {subject}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn get_list(&self, id: &str) -> Result<TodoList> {
        self.log(format!("get_list {id}"));
        self.gate(&self.fail_lists, "lists")?;
        self.lists
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_todos(&self, list_id: &str) -> Result<Vec<Todo>> {
        self.log(format!("get_todos {list_id}"));
        let delay = *self.todos_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.gate(&self.fail_todos, "todos")?;
        Ok(self.rows(list_id))
    }

    async fn create_todo(&self, list_id: &str, title: &str) -> Result<Todo> {
        self.log(format!("create_todo {title}"));
        let delay = *self.creates_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.gate(&self.fail_creates, "create")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let todo = Todo {
            id: TodoId::Remote(id),
            list_id: list_id.to_string(),
            title: title.to_string(),
            completed: false,
            created_at: 1_000 + id as Timestamp,
        };
        self.todos.lock().unwrap().push(todo.clone());
        Ok(todo)
    }

    async fn update_todo(&self, id: RemoteId, completed: bool) -> Result<Todo> {
        self.log(format!("update_todo {id} {completed}"));
        self.gate(&self.fail_updates, "update")?;
        let mut rows = self.todos.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|t| t.id == TodoId::Remote(id))
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        row.completed = completed;
        Ok(row.clone())
    }

    async fn delete_todo(&self, id: RemoteId) -> Result<()> {
        self.log(format!("delete_todo {id}"));
        self.gate(&self.fail_deletes, "delete")?;
        let mut rows = self.todos.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.id != TodoId::Remote(id));
        if rows.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_list(&self, name: &str, owner_guid: &str) -> Result<TodoList> {
        self.log(format!("create_list {name}"));
        self.gate(&self.fail_lists, "lists")?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let list = TodoList {
            id: format!("list-{id}"),
            name: name.to_string(),
            owner_guid: owner_guid.to_string(),
            created_at: 1_000 + id as Timestamp,
            updated_at: 1_000 + id as Timestamp,
        };
        self.lists.lock().unwrap().insert(list.id.clone(), list.clone());
        Ok(list)
    }

    async fn lists_for_owner(&self, owner_guid: &str) -> Result<Vec<TodoList>> {
        self.log(format!("lists_for_owner {owner_guid}"));
        self.gate(&self.fail_lists, "lists")?;
        Ok(self
            .lists
            .lock()
            .unwrap()
            .values()
            .filter(|l| l.owner_guid == owner_guid)
            .cloned()
            .collect())
    }
}

/// In-memory cache recording every write in order.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<ListId, Vec<Todo>>>,
    last_active: Mutex<Option<ListId>>,
    writes: Mutex<Vec<(ListId, Vec<Todo>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, list_id: &str, todos: Vec<Todo>) {
        self.entries.lock().unwrap().insert(list_id.to_string(), todos);
    }

    pub fn seed_last_active(&self, list_id: &str) {
        *self.last_active.lock().unwrap() = Some(list_id.to_string());
    }

    /// Snapshots written for `list_id`, oldest first.
    pub fn writes_for(&self, list_id: &str) -> Vec<Vec<Todo>> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == list_id)
            .map(|(_, todos)| todos.clone())
            .collect()
    }
}

impl TodoCache for MemoryCache {
    fn read(&self, list_id: &str) -> Option<Vec<Todo>> {
        self.entries.lock().unwrap().get(list_id).cloned()
    }

    fn write(&self, list_id: &str, todos: &[Todo], _saved_at: Timestamp) {
        self.entries
            .lock()
            .unwrap()
            .insert(list_id.to_string(), todos.to_vec());
        self.writes
            .lock()
            .unwrap()
            .push((list_id.to_string(), todos.to_vec()));
    }

    fn read_last_active(&self) -> Option<ListId> {
        self.last_active.lock().unwrap().clone()
    }

    fn write_last_active(&self, list_id: &str) {
        *self.last_active.lock().unwrap() = Some(list_id.to_string());
    }
}
