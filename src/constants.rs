//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Application name
pub const APP_NAME: &str = "courier";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of history entries kept, newest first
pub const MAX_HISTORY: usize = 100;

/// Default name for new requests
pub const DEFAULT_REQUEST_NAME: &str = "New Request";

/// Default name for new collections
pub const DEFAULT_COLLECTION_NAME: &str = "New Collection";

/// Default name for new environments
pub const DEFAULT_ENVIRONMENT_NAME: &str = "New Environment";

/// Directory under the home directory holding all persisted data
pub const DATA_DIR_NAME: &str = ".courier";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "COURIER_HOME";

/// File holding the global variables, outside the collection stores
pub const GLOBALS_FILE: &str = "globals.json";

/// Optional configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Default log file name
pub const DEFAULT_LOG_FILE: &str = "courier.log";

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
