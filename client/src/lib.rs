//! # Tally Client
//!
//! Binds the pure [`tally_engine`] state machine to real collaborators: an
//! HTTP remote store, a file-backed cache, and a task-based sync service.
//!
//! ## Architecture
//!
//! - [`remote::RemoteStore`] / [`remote::HttpRemote`]: the authoritative
//!   backend, reached with `reqwest`.
//! - [`cache::TodoCache`] / [`cache::FileCache`]: durable per-list snapshots
//!   used as the degraded-mode fallback.
//! - [`context::ListContext`]: tracks the current list and broadcasts
//!   switches on a watch channel.
//! - [`sync::SyncService`]: the single task owning the session; it executes
//!   the session's effects, feeds completions back, persists applied state
//!   and publishes snapshots.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_client::{FileCache, HttpRemote, ListContext, SyncService};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(FileCache::new(".tally-cache")?);
//! let remote = Arc::new(HttpRemote::new("http://localhost:8080", None));
//!
//! let context = ListContext::new(remote.clone(), cache.clone());
//! let (handle, _service) = SyncService::spawn(remote, cache, context.subscribe());
//!
//! context.set_current("my-list-id").await;
//! handle.add("buy milk")?;
//! handle.settled().await?;
//!
//! println!("{} todos", handle.snapshot().todos.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod remote;
pub mod sync;

pub use cache::{FileCache, TodoCache};
pub use config::{Config, ConfigError};
pub use context::ListContext;
pub use error::ServiceError;
pub use remote::{HttpRemote, RemoteStore};
pub use sync::{SyncHandle, SyncService};
