//! Client messages - requests from a `ClientHandle` to the client actor

use tokio::sync::oneshot;

use crate::app::ClientState;
use crate::models::{ApiRequest, ApiResponse, Collection, Environment, KeyValuePair};

/// Reply channel for operations that can fail
pub type Reply<T> = oneshot::Sender<anyhow::Result<T>>;

/// Commands processed by the client actor, one at a time
#[derive(Debug)]
pub enum ClientCommand {
    /// Compile, invoke, normalize and record. Always answers with a response.
    Send {
        request: ApiRequest,
        reply: oneshot::Sender<ApiResponse>,
    },

    // Requests
    CreateRequest {
        collection_id: Option<String>,
        reply: Reply<ApiRequest>,
    },
    UpdateRequest {
        request: ApiRequest,
        reply: Reply<ApiRequest>,
    },
    DeleteRequest {
        id: String,
        reply: Reply<()>,
    },
    DuplicateRequest {
        id: String,
        reply: Reply<Option<ApiRequest>>,
    },
    SetActiveRequest {
        request: Option<ApiRequest>,
    },

    // Collections
    CreateCollection {
        name: Option<String>,
        reply: Reply<Collection>,
    },
    UpdateCollection {
        collection: Collection,
        reply: Reply<Collection>,
    },
    DeleteCollection {
        id: String,
        reply: Reply<()>,
    },

    // Environments
    CreateEnvironment {
        name: Option<String>,
        reply: Reply<Environment>,
    },
    UpdateEnvironment {
        environment: Environment,
        reply: Reply<Environment>,
    },
    SetActiveEnvironment {
        id: Option<String>,
        reply: Reply<()>,
    },
    DeleteEnvironment {
        id: String,
        reply: Reply<()>,
    },

    // Variables and history
    UpdateGlobals {
        variables: Vec<KeyValuePair>,
        reply: Reply<()>,
    },
    ClearHistory {
        reply: Reply<()>,
    },

    /// Copy of the current in-memory state
    Snapshot {
        reply: oneshot::Sender<ClientState>,
    },

    /// Wait for in-flight sends, then stop
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
