//! Client orchestrator - owns the in-memory state and runs the send pipeline
//!
//! A send is split in two so the actor can let independent sends interleave:
//! [`ApiClient::begin_send`] sets the loading flag and compiles against the
//! scopes in memory at that moment, [`ApiClient::finish_send`] normalizes,
//! records history and applies the response if the send is still the latest.

use std::sync::Arc;

use anyhow::{bail, Context};

use crate::compiler::{compile, CompiledRequest};
use crate::history::HistoryLog;
use crate::models::{
    generate_id, now_millis, ApiRequest, ApiResponse, Collection, Environment, HistoryItem,
    KeyValuePair,
};
use crate::network::{invoke, Invocation, Transport};
use crate::normalize::normalize;
use crate::storage::Store;
use crate::variables::VariableScopes;

/// Everything the presentation layer reads
#[derive(Clone, Debug, Default)]
pub struct ClientState {
    pub requests: Vec<ApiRequest>,
    pub collections: Vec<Collection>,
    pub environments: Vec<Environment>,
    pub history: HistoryLog,
    pub active_request: Option<ApiRequest>,
    pub active_response: Option<ApiResponse>,
    pub is_loading: bool,
    pub global_variables: Vec<KeyValuePair>,
    /// Set once start-up loading finished, successfully or not
    pub initialized: bool,
}

impl ClientState {
    /// The environment flagged active, if any. At most one is.
    pub fn active_environment(&self) -> Option<&Environment> {
        self.environments.iter().find(|env| env.is_active)
    }

    pub fn request(&self, id: &str) -> Option<&ApiRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    pub fn environment(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.id == id)
    }
}

/// A send that has been compiled and is waiting for its invocation
#[derive(Clone, Debug)]
pub struct PendingSend {
    pub send_id: u64,
    /// The request as it was when the send started; this is what history keeps
    pub snapshot: ApiRequest,
    pub compiled: CompiledRequest,
}

pub struct ApiClient<S: Store, T: Transport> {
    state: ClientState,
    store: S,
    transport: Arc<T>,
    latest_send_id: u64,
}

impl<S: Store, T: Transport> ApiClient<S, T> {
    /// Load persisted state. Never fails: a storage error is logged and the
    /// client starts empty.
    pub async fn load(store: S, transport: T) -> Self {
        let mut client = ApiClient {
            state: ClientState::default(),
            store,
            transport: Arc::new(transport),
            latest_send_id: 0,
        };

        if let Err(e) = client.reload().await {
            tracing::warn!(error = %format!("{:#}", e), "Failed to load persisted state, starting empty");
            client.state = ClientState::default();
            // History stays bounded even when the rest could not be read
            if let Err(e) = client.load_history().await {
                tracing::warn!(error = %format!("{:#}", e), "Failed to load history");
                client.state.history = HistoryLog::new();
            }
        }
        client.state.initialized = true;
        client
    }

    async fn reload(&mut self) -> anyhow::Result<()> {
        let mut requests: Vec<ApiRequest> = self.store.get_all().await.context("Loading requests")?;
        let mut collections: Vec<Collection> =
            self.store.get_all().await.context("Loading collections")?;
        let environments: Vec<Environment> =
            self.store.get_all().await.context("Loading environments")?;
        let globals = self.store.load_globals().await.context("Loading global variables")?;

        requests.sort_by_key(|r| r.created_at);
        collections.sort_by_key(|c| c.created_at);
        self.load_history().await?;

        tracing::info!(
            requests = requests.len(),
            collections = collections.len(),
            environments = environments.len(),
            history = self.state.history.len(),
            "Loaded persisted state"
        );

        self.state.requests = requests;
        self.state.collections = collections;
        self.state.environments = environments;
        self.state.global_variables = globals;
        Ok(())
    }

    /// Load history and delete whatever is past the bound from storage
    async fn load_history(&mut self) -> anyhow::Result<()> {
        let items: Vec<HistoryItem> = self.store.get_all().await.context("Loading history")?;
        let (history, overflow) = HistoryLog::from_items(items);
        for id in overflow {
            self.store
                .remove::<HistoryItem>(&id)
                .await
                .context("Trimming history")?;
        }
        self.state.history = history;
        Ok(())
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Scopes read straight from memory, no snapshot
    pub fn scopes(&self) -> VariableScopes<'_> {
        VariableScopes::new(
            self.state
                .active_environment()
                .map(|env| env.variables.as_slice()),
            &self.state.global_variables,
        )
    }

    /// Substitute `{{name}}` placeholders with the current scopes
    pub fn resolve(&self, text: &str) -> String {
        self.scopes().resolve_owned(text)
    }

    // ------------------------------------------------------------------
    // Send pipeline
    // ------------------------------------------------------------------

    /// Idle -> Sending. Compilation cannot fail; any malformed URL or header
    /// surfaces from the transport.
    pub fn begin_send(&mut self, request: &ApiRequest) -> PendingSend {
        self.latest_send_id += 1;
        let send_id = self.latest_send_id;
        self.state.is_loading = true;

        let compiled = compile(request, &self.scopes());
        PendingSend {
            send_id,
            snapshot: request.clone(),
            compiled,
        }
    }

    /// Sending -> Succeeded | Failed. Always yields exactly one response and
    /// always records it.
    pub async fn finish_send(
        &mut self,
        send_id: u64,
        snapshot: &ApiRequest,
        invocation: Invocation,
    ) -> ApiResponse {
        let response = normalize(invocation.outcome, invocation.elapsed);
        let is_latest = send_id == self.latest_send_id;

        if is_latest {
            self.state.active_response = Some(response.clone());
        }

        if let Err(e) = self
            .state
            .history
            .record(&self.store, snapshot, response.clone())
            .await
        {
            tracing::warn!(send_id, error = %e, "Failed to record history");
        }

        if is_latest {
            self.state.is_loading = false;
        } else {
            tracing::debug!(send_id, latest = self.latest_send_id, "Discarding stale response");
        }

        tracing::info!(
            send_id,
            status = response.status,
            time_ms = response.time,
            size = response.size,
            "Send finished"
        );
        response
    }

    /// Run the whole pipeline inline
    pub async fn send(&mut self, request: &ApiRequest) -> ApiResponse {
        let pending = self.begin_send(request);
        let invocation = invoke(self.transport.as_ref(), pending.compiled).await;
        self.finish_send(pending.send_id, &pending.snapshot, invocation)
            .await
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Create a default request, optionally filed under a collection
    pub async fn create_request(&mut self, collection_id: Option<&str>) -> anyhow::Result<ApiRequest> {
        let request = ApiRequest::new();
        self.store.save(&request).await?;
        self.state.requests.push(request.clone());

        if let Some(collection_id) = collection_id {
            if let Some(mut collection) = self.state.collection(collection_id).cloned() {
                collection.requests.push(request.id.clone());
                collection.updated_at = now_millis();
                self.store.save(&collection).await?;
                self.replace_collection(collection);
            } else {
                tracing::warn!(collection_id, "Unknown collection, request left unfiled");
            }
        }

        tracing::debug!(id = %request.id, "Created request");
        Ok(request)
    }

    pub async fn update_request(&mut self, mut request: ApiRequest) -> anyhow::Result<ApiRequest> {
        request.updated_at = now_millis();
        self.store.save(&request).await?;

        match self.state.requests.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request.clone(),
            None => self.state.requests.push(request.clone()),
        }
        if self
            .state
            .active_request
            .as_ref()
            .is_some_and(|active| active.id == request.id)
        {
            self.state.active_request = Some(request.clone());
        }
        Ok(request)
    }

    /// Remove a request and every collection reference to it
    pub async fn delete_request(&mut self, id: &str) -> anyhow::Result<()> {
        self.store.remove::<ApiRequest>(id).await?;
        self.state.requests.retain(|r| r.id != id);

        let referencing: Vec<Collection> = self
            .state
            .collections
            .iter()
            .filter(|c| c.requests.iter().any(|r| r == id))
            .cloned()
            .collect();
        for mut collection in referencing {
            collection.requests.retain(|r| r != id);
            collection.updated_at = now_millis();
            self.store.save(&collection).await?;
            self.replace_collection(collection);
        }

        if self
            .state
            .active_request
            .as_ref()
            .is_some_and(|active| active.id == id)
        {
            self.state.active_request = None;
            self.state.active_response = None;
        }
        Ok(())
    }

    /// Copy with a new id and a " (copy)" name suffix. `None` for an unknown id.
    pub async fn duplicate_request(&mut self, id: &str) -> anyhow::Result<Option<ApiRequest>> {
        let Some(original) = self.state.request(id) else {
            return Ok(None);
        };

        let now = now_millis();
        let copy = ApiRequest {
            id: generate_id(),
            name: format!("{} (copy)", original.name),
            created_at: now,
            updated_at: now,
            ..original.clone()
        };
        self.store.save(&copy).await?;
        self.state.requests.push(copy.clone());
        Ok(Some(copy))
    }

    /// Selecting a different request clears the response shown for the old one
    pub fn set_active_request(&mut self, request: Option<ApiRequest>) {
        let same = match (&self.state.active_request, &request) {
            (Some(current), Some(next)) => current.id == next.id,
            _ => false,
        };
        if !same {
            self.state.active_response = None;
        }
        self.state.active_request = request;
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    pub async fn create_collection(&mut self, name: Option<&str>) -> anyhow::Result<Collection> {
        let collection = Collection::new(name);
        self.store.save(&collection).await?;
        self.state.collections.push(collection.clone());
        Ok(collection)
    }

    pub async fn update_collection(&mut self, mut collection: Collection) -> anyhow::Result<Collection> {
        collection.updated_at = now_millis();
        self.store.save(&collection).await?;
        self.replace_collection(collection.clone());
        Ok(collection)
    }

    /// Deletes the collection and every request it lists. Unknown ids are a no-op.
    pub async fn delete_collection(&mut self, id: &str) -> anyhow::Result<()> {
        let Some(collection) = self.state.collection(id).cloned() else {
            return Ok(());
        };

        for request_id in &collection.requests {
            self.delete_request(request_id).await?;
        }
        self.store.remove::<Collection>(id).await?;
        self.state.collections.retain(|c| c.id != id);
        Ok(())
    }

    fn replace_collection(&mut self, collection: Collection) {
        match self.state.collections.iter_mut().find(|c| c.id == collection.id) {
            Some(existing) => *existing = collection,
            None => self.state.collections.push(collection),
        }
    }

    // ------------------------------------------------------------------
    // Environments and variables
    // ------------------------------------------------------------------

    pub async fn create_environment(&mut self, name: Option<&str>) -> anyhow::Result<Environment> {
        let environment = Environment::new(name);
        self.store.save(&environment).await?;
        self.state.environments.push(environment.clone());
        Ok(environment)
    }

    /// Save name and variables. The active flag only changes through
    /// [`ApiClient::set_active_environment`].
    pub async fn update_environment(&mut self, mut environment: Environment) -> anyhow::Result<Environment> {
        environment.is_active = self
            .state
            .environment(&environment.id)
            .is_some_and(|e| e.is_active);
        self.store.save(&environment).await?;

        match self
            .state
            .environments
            .iter_mut()
            .find(|e| e.id == environment.id)
        {
            Some(existing) => *existing = environment.clone(),
            None => self.state.environments.push(environment.clone()),
        }
        Ok(environment)
    }

    /// Make `id` the only active environment; `None` deactivates all
    pub async fn set_active_environment(&mut self, id: Option<&str>) -> anyhow::Result<()> {
        if let Some(id) = id {
            if self.state.environment(id).is_none() {
                bail!("Unknown environment: {}", id);
            }
        }

        for index in 0..self.state.environments.len() {
            let env = &self.state.environments[index];
            if env.is_active && Some(env.id.as_str()) != id {
                let mut env = env.clone();
                env.is_active = false;
                self.store.save(&env).await?;
                self.state.environments[index] = env;
            }
        }

        if let Some(id) = id {
            if let Some(index) = self.state.environments.iter().position(|e| e.id == id) {
                if !self.state.environments[index].is_active {
                    let mut env = self.state.environments[index].clone();
                    env.is_active = true;
                    self.store.save(&env).await?;
                    self.state.environments[index] = env;
                }
            }
        }

        tracing::info!(environment = ?id, "Active environment changed");
        Ok(())
    }

    pub async fn delete_environment(&mut self, id: &str) -> anyhow::Result<()> {
        self.store.remove::<Environment>(id).await?;
        self.state.environments.retain(|e| e.id != id);
        Ok(())
    }

    /// Replace the whole global list, persisted first
    pub async fn update_global_variables(&mut self, variables: Vec<KeyValuePair>) -> anyhow::Result<()> {
        self.store.save_globals(&variables).await?;
        self.state.global_variables = variables;
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub async fn clear_history(&mut self) -> anyhow::Result<()> {
        self.state.history.clear(&self.store).await?;
        Ok(())
    }
}
