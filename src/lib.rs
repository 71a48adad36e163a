//! # Repofy
//!
//! A small code-sharing server: users sign up, create public or private
//! repositories of text files, star and comment on each other's work and keep
//! a profile. Usable as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use repofy::auth::LocalIdentityProvider;
//! use repofy::config::ServerConfig;
//! use repofy::server::{AppState, create_router};
//! use repofy::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store: Arc<dyn Store> = Arc::new(SqliteStore::new(config.db_path()).unwrap());
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     identity: Arc::new(LocalIdentityProvider::new(store.clone(), config.session_ttl_hours)),
//!     store,
//!     config,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `repofy` binary. Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
