//! devshare adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite and in-memory post stores
//! - `social`: per-platform publish adapters (LinkedIn, X, Bluesky stub)
//! - `generator`: generative-AI draft gateway
//! - `oauth`: X OAuth 2.0 / PKCE client and helpers

mod store_memory;
mod store_sqlite;

pub mod generator;
pub mod oauth;
pub mod social;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_memory::InMemoryStore;
    pub use crate::store_sqlite::SqliteStore;
}
