//! A small in-process todo API built on axum, mirroring the real backend's
//! routes, payload shapes and status codes.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tally_engine::TodoList;
use tokio::task::JoinHandle;

/// Wire form of a todo row, as the backend serves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoRow {
    pub id: i64,
    pub list_id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTodoBody {
    list_id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTodoBody {
    completed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateListBody {
    name: String,
    owner_guid: String,
}

/// Backend state, shared with the test so it can seed rows and trip faults.
#[derive(Default)]
pub struct FakeApi {
    lists: Mutex<HashMap<String, TodoList>>,
    todos: Mutex<Vec<TodoRow>>,
    next_id: AtomicI64,
    fail_lists: AtomicBool,
    fail_todos: AtomicBool,
    fail_creates: AtomicBool,
    auth_headers: Mutex<Vec<Option<String>>>,
}

impl FakeApi {
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

    pub fn seed_todo(&self, list_id: &str, title: &str, completed: bool) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.todos.lock().unwrap().push(TodoRow {
            id,
            list_id: list_id.to_string(),
            title: title.to_string(),
            completed,
            created_at: 1_000 + id as u64,
        });
        id
    }

    pub fn rows_for(&self, list_id: &str) -> Vec<TodoRow> {
        self.todos
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.list_id == list_id)
            .cloned()
            .collect()
    }

    /// Make `GET /api/lists/*` answer 500.
    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    /// Make `GET /api/todos/list/*` answer 500.
    pub fn fail_todos(&self, fail: bool) {
        self.fail_todos.store(fail, Ordering::SeqCst);
    }

    /// Make `POST /api/todos` answer 500.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Authorization header values observed so far, one per request.
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_headers.lock().unwrap().clone()
    }

    fn record_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().unwrap().push(value);
    }
}

/// A running fake backend.
pub struct FakeServer {
    pub addr: SocketAddr,
    pub api: Arc<FakeApi>,
    server: JoinHandle<()>,
}

impl FakeServer {
    pub async fn spawn() -> Self {
        let api = Arc::new(FakeApi::default());
        let app = Router::new()
            .route("/api/lists", post(create_list))
            .route("/api/lists/{id}", get(get_list))
            .route("/api/lists/user/{owner}", get(lists_for_owner))
            .route("/api/todos", post(create_todo))
            .route("/api/todos/list/{list_id}", get(list_todos))
            .route("/api/todos/{id}", patch(update_todo).delete(delete_todo))
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, api, server }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop answering, as if the backend went away.
    pub fn shut_down(&self) {
        self.server.abort();
    }
}

async fn get_list(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TodoList>, StatusCode> {
    api.record_auth(&headers);
    if api.fail_lists.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    api.lists
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn lists_for_owner(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(owner): Path<String>,
) -> Result<Json<Vec<TodoList>>, StatusCode> {
    api.record_auth(&headers);
    if api.fail_lists.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let lists = api
        .lists
        .lock()
        .unwrap()
        .values()
        .filter(|l| l.owner_guid == owner)
        .cloned()
        .collect();
    Ok(Json(lists))
}

async fn create_list(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(body): Json<CreateListBody>,
) -> Result<Json<TodoList>, StatusCode> {
    api.record_auth(&headers);
    if api.fail_lists.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let id = api.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let list = TodoList {
        id: format!("list-{id}"),
        name: body.name,
        owner_guid: body.owner_guid,
        created_at: 1_000 + id as u64,
        updated_at: 1_000 + id as u64,
    };
    api.lists.lock().unwrap().insert(list.id.clone(), list.clone());
    Ok(Json(list))
}

async fn list_todos(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(list_id): Path<String>,
) -> Result<Json<Vec<TodoRow>>, StatusCode> {
    api.record_auth(&headers);
    if api.fail_todos.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(api.rows_for(&list_id)))
}

async fn create_todo(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Json(body): Json<CreateTodoBody>,
) -> Result<Json<TodoRow>, StatusCode> {
    api.record_auth(&headers);
    if api.fail_creates.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let id = api.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let row = TodoRow {
        id,
        list_id: body.list_id,
        title: body.title,
        completed: false,
        created_at: 1_000 + id as u64,
    };
    api.todos.lock().unwrap().push(row.clone());
    Ok(Json(row))
}

async fn update_todo(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTodoBody>,
) -> Result<Json<TodoRow>, StatusCode> {
    api.record_auth(&headers);
    let mut rows = api.todos.lock().unwrap();
    let row = rows
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    row.completed = body.completed;
    Ok(Json(row.clone()))
}

async fn delete_todo(
    State(api): State<Arc<FakeApi>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    api.record_auth(&headers);
    let mut rows = api.todos.lock().unwrap();
    let before = rows.len();
    rows.retain(|r| r.id != id);
    if rows.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
