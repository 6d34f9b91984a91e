//! Core record types: todos, todo lists, and the tagged id union.

use crate::{ListId, LocalId, RemoteId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a todo item.
///
/// A todo starts life under a client-assigned `Local` surrogate id and is
/// rebound to the server-assigned `Remote` id once the create call is
/// confirmed. Keeping the two spaces in separate variants means a surrogate
/// can never collide with a canonical id, and callers can tell at a glance
/// whether an item has a remote row yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoId {
    /// Canonical id assigned by the remote store
    Remote(RemoteId),
    /// Surrogate id assigned by the session, valid only on this client
    Local(LocalId),
}

impl TodoId {
    /// Whether this is a client-assigned surrogate id.
    pub fn is_local(&self) -> bool {
        matches!(self, TodoId::Local(_))
    }

    /// Whether this is a server-assigned canonical id.
    pub fn is_remote(&self) -> bool {
        matches!(self, TodoId::Remote(_))
    }

    /// The canonical id, if this todo has one.
    pub fn as_remote(&self) -> Option<RemoteId> {
        match self {
            TodoId::Remote(id) => Some(*id),
            TodoId::Local(_) => None,
        }
    }

    /// The surrogate id, if this todo still carries one.
    pub fn as_local(&self) -> Option<LocalId> {
        match self {
            TodoId::Remote(_) => None,
            TodoId::Local(id) => Some(*id),
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Remote(id) => write!(f, "{}", id),
            TodoId::Local(id) => write!(f, "local-{}", id),
        }
    }
}

impl FromStr for TodoId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("local-") {
            let id = rest
                .parse::<LocalId>()
                .map_err(|_| format!("invalid local todo id: {}", s))?;
            Ok(TodoId::Local(id))
        } else {
            let id = s
                .parse::<RemoteId>()
                .map_err(|_| format!("invalid todo id: {}", s))?;
            Ok(TodoId::Remote(id))
        }
    }
}

/// A single todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Surrogate or canonical identifier
    pub id: TodoId,
    /// List this todo belongs to
    pub list_id: ListId,
    /// User-entered title
    pub title: String,
    /// Completion flag
    pub completed: bool,
    /// When the todo was created (milliseconds since epoch)
    pub created_at: Timestamp,
}

impl Todo {
    /// Create an optimistic todo under a surrogate id.
    pub fn new_local(
        local_id: LocalId,
        list_id: impl Into<ListId>,
        title: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: TodoId::Local(local_id),
            list_id: list_id.into(),
            title: title.into(),
            completed: false,
            created_at: timestamp,
        }
    }

    /// Whether this todo is still awaiting its canonical id.
    pub fn is_pending(&self) -> bool {
        self.id.is_local()
    }
}

/// A named todo list, as held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoList {
    /// Unique identifier, assigned by the remote store at creation
    pub id: ListId,
    /// Display name
    pub name: String,
    /// Owner this list belongs to
    pub owner_guid: String,
    /// When the list was created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the list was last updated (milliseconds since epoch)
    pub updated_at: Timestamp,
}
