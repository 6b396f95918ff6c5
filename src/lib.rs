//! # Courier
//!
//! The core of a Postman-style HTTP API client: compose requests, resolve
//! `{{variables}}` from the active environment and globals, send them, and
//! keep a bounded history of what was sent and what came back.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE
//! - Query params, headers and bodies (JSON, raw, form-data, urlencoded)
//! - Auth support (Bearer, Basic, API key in header or query)
//! - Environments with a single active one, plus global variables
//! - Collections of saved requests
//! - Request history, newest first, capped at 100 entries
//!
//! ## Architecture
//! Actor-based with channels:
//! - Client Layer (`ClientHandle` -> `ClientActor`) - state and persistence
//! - Network Layer (Tokio runtime) - request execution
//!
//! A send runs compile -> invoke -> normalize -> record; a transport failure
//! becomes a response with status 0 rather than an error.

pub mod app;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod history;
pub mod logging;
pub mod messages;
pub mod models;
pub mod network;
pub mod normalize;
pub mod storage;
pub mod variables;

// Re-export commonly used types
pub use app::{ApiClient, ClientActor, ClientHandle, ClientState};
pub use compiler::{compile, CompiledBody, CompiledRequest};
pub use config::Config;
pub use history::HistoryLog;
pub use models::{
    ApiKeyLocation, ApiRequest, ApiResponse, AuthConfig, AuthKind, BodyKind, Collection,
    Environment, HistoryItem, HttpMethod, KeyValuePair, RequestBody, StatusClass,
};
pub use network::{HttpTransport, Transport};
pub use normalize::{format_bytes, format_time, normalize};
pub use storage::{FileStore, MemoryStore, Store, StoreError};
pub use variables::VariableScopes;
