//! # Tally Engine
//!
//! The optimistic sync state machine for Tally todo lists.
//!
//! This crate provides the core logic for keeping one list's in-memory todo
//! collection consistent across optimistic local mutations, an unreliable
//! remote store and a durable local cache. It decides; the caller performs
//! the I/O and feeds results back.
//!
//! ## Design Principles
//!
//! - **No IO**: Engine has no knowledge of files, network, or platform
//! - **Deterministic**: Same inputs always produce same outputs; timestamps
//!   are passed in, never read from a clock
//! - **Testable**: Pure logic, no mocks needed
//! - **Portable**: Runs anywhere Rust runs (native, WASM, embedded)
//!
//! ## Core Concepts
//!
//! ### Todos and surrogate ids
//!
//! A [`Todo`] created optimistically carries a [`TodoId::Local`] surrogate
//! id until the remote store confirms the create, at which point the
//! canonical [`TodoId::Remote`] row replaces it in place. The two id spaces
//! are separate enum variants, so they can never collide.
//!
//! ### Sessions and effects
//!
//! A [`ListSession`] holds the collection, loading flag and error channel
//! for the current list. Mutations apply locally first and return an
//! [`Outcome`] carrying the [`Effect`] (remote call) the caller must issue;
//! the call's result is fed back through the matching `complete_*` method,
//! tagged with the list it was issued for so stale responses after a list
//! switch are discarded.
//!
//! ### Degraded mode
//!
//! When a load fails, the session installs the caller-supplied cache
//! fallback (or an empty collection) together with a warning message.
//! Failed creates and updates retain their optimistic state and park a
//! retry in the [`PendingQueue`]; failed deletes roll back.
//!
//! ### Snapshots
//!
//! Observers receive one atomic [`TodoSnapshot`] per change (collection +
//! loading + error + revision), never three independently torn streams.
//! [`CachedList`] is the durable cache document, format-versioned for
//! forward compatibility.
//!
//! ## Quick Start
//!
//! ```rust
//! use tally_engine::{Effect, ListSession, Todo, TodoId};
//!
//! let mut session = ListSession::new();
//!
//! // Select a list and load it (the caller performs the fetch).
//! session.begin_load("list-1");
//! session.complete_load("list-1", Ok(vec![]), None);
//!
//! // Optimistic add: the item is visible immediately under a surrogate id.
//! let outcome = session.add_todo("buy milk", 1706745600000);
//! assert_eq!(session.todos()[0].id, TodoId::Local(1));
//!
//! // The outcome tells the caller which remote call to make.
//! let Some(Effect::Create { list_id, local_id, title }) = outcome.effect().cloned() else {
//!     unreachable!();
//! };
//!
//! // Feed the canonical row back; the surrogate is replaced in place.
//! let canonical = Todo {
//!     id: TodoId::Remote(42),
//!     list_id,
//!     title,
//!     completed: false,
//!     created_at: 1706745600000,
//! };
//! session.complete_create("list-1", local_id, Ok(canonical));
//! assert_eq!(session.todos()[0].id, TodoId::Remote(42));
//! ```

pub mod error;
pub mod pending;
pub mod session;
pub mod snapshot;
pub mod todo;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use pending::{PendingChange, PendingQueue};
pub use session::{
    Effect, ListSession, Outcome, SkipReason, DELETE_FAILED_WARNING, LOAD_FALLBACK_WARNING,
    SAVE_FAILED_WARNING, UPDATE_FAILED_WARNING,
};
pub use snapshot::{cache_key, CachedList, TodoSnapshot, CACHE_FORMAT_VERSION};
pub use todo::{Todo, TodoId, TodoList};

/// Server-assigned list identifier (a UUID string on the wire).
pub type ListId = String;

/// Canonical row id assigned by the remote store.
pub type RemoteId = i64;

/// Client-local surrogate id for todos not yet confirmed remotely.
pub type LocalId = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
