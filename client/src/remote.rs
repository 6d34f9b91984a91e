//! Remote store access over HTTP.
//!
//! [`RemoteStore`] is the seam the sync service talks through; [`HttpRemote`]
//! binds it to the todo API with `reqwest`. Every transport or protocol
//! failure is folded into the engine's error taxonomy so callers only ever
//! see [`Error::NotFound`] or [`Error::RemoteUnavailable`].

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tally_engine::{Error, ListId, RemoteId, Result, Timestamp, Todo, TodoId, TodoList};
use tracing::debug;

/// CRUD surface of the authoritative backend.
///
/// Object safe so services can hold `Arc<dyn RemoteStore>` and tests can
/// substitute scripted implementations.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one list's metadata.
    async fn get_list(&self, id: &str) -> Result<TodoList>;

    /// Fetch the ordered todo collection of a list. Empty is a valid answer.
    async fn get_todos(&self, list_id: &str) -> Result<Vec<Todo>>;

    /// Create a todo row; the server assigns the canonical id.
    async fn create_todo(&self, list_id: &str, title: &str) -> Result<Todo>;

    /// Push a completed flag to an existing row.
    async fn update_todo(&self, id: RemoteId, completed: bool) -> Result<Todo>;

    /// Delete a row.
    async fn delete_todo(&self, id: RemoteId) -> Result<()>;

    /// Create a new list owned by `owner_guid`.
    async fn create_list(&self, name: &str, owner_guid: &str) -> Result<TodoList>;

    /// Enumerate the lists owned by `owner_guid`.
    async fn lists_for_owner(&self, owner_guid: &str) -> Result<Vec<TodoList>>;
}

/// Wire form of a todo row. The server only knows canonical integer ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoRow {
    id: RemoteId,
    list_id: ListId,
    title: String,
    completed: bool,
    created_at: Timestamp,
}

impl From<TodoRow> for Todo {
    fn from(row: TodoRow) -> Self {
        Todo {
            id: TodoId::Remote(row.id),
            list_id: row.list_id,
            title: row.title,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTodoBody<'a> {
    list_id: &'a str,
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateTodoBody {
    completed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateListBody<'a> {
    name: &'a str,
    owner_guid: &'a str,
}

/// [`RemoteStore`] implementation backed by the todo HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            auth_token,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "remote request");
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request and map the response status onto the error taxonomy.
    async fn send(&self, request: reqwest::RequestBuilder, subject: &str) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(subject.to_string()));
        }
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!("{subject} returned {status}")));
        }
        Ok(response)
    }

    async fn json<T>(&self, request: reqwest::RequestBuilder, subject: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.send(request, subject).await?;
        response
            .json()
            .await
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn get_list(&self, id: &str) -> Result<TodoList> {
        let request = self.request(Method::GET, &format!("/api/lists/{id}"));
        self.json(request, &format!("list {id}")).await
    }

    async fn get_todos(&self, list_id: &str) -> Result<Vec<Todo>> {
        let request = self.request(Method::GET, &format!("/api/todos/list/{list_id}"));
        let rows: Vec<TodoRow> = self.json(request, &format!("todos for list {list_id}")).await?;
        Ok(rows.into_iter().map(Todo::from).collect())
    }

    async fn create_todo(&self, list_id: &str, title: &str) -> Result<Todo> {
        let request = self
            .request(Method::POST, "/api/todos")
            .json(&CreateTodoBody { list_id, title });
        let row: TodoRow = self.json(request, "todo create").await?;
        Ok(row.into())
    }

    async fn update_todo(&self, id: RemoteId, completed: bool) -> Result<Todo> {
        let request = self
            .request(Method::PATCH, &format!("/api/todos/{id}"))
            .json(&UpdateTodoBody { completed });
        let row: TodoRow = self.json(request, &format!("todo {id}")).await?;
        Ok(row.into())
    }

    async fn delete_todo(&self, id: RemoteId) -> Result<()> {
        let request = self.request(Method::DELETE, &format!("/api/todos/{id}"));
        self.send(request, &format!("todo {id}")).await?;
        Ok(())
    }

    async fn create_list(&self, name: &str, owner_guid: &str) -> Result<TodoList> {
        let request = self
            .request(Method::POST, "/api/lists")
            .json(&CreateListBody { name, owner_guid });
        self.json(request, "list create").await
    }

    async fn lists_for_owner(&self, owner_guid: &str) -> Result<Vec<TodoList>> {
        let request = self.request(Method::GET, &format!("/api/lists/user/{owner_guid}"));
        self.json(request, &format!("lists for {owner_guid}")).await
    }
}
