//! Client actor - message loop processing handle commands and network responses

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::sync::{mpsc, oneshot};

use crate::app::client::{ApiClient, ClientState};
use crate::messages::{ClientCommand, NetworkCommand, NetworkResponse};
use crate::models::{ApiRequest, ApiResponse, Collection, Environment, KeyValuePair};
use crate::network::{Invocation, NetworkActor, Transport};
use crate::storage::Store;

/// A send waiting on the network actor
struct InFlight {
    snapshot: ApiRequest,
    reply: oneshot::Sender<ApiResponse>,
}

/// Owns the [`ApiClient`]. Commands are handled one at a time while the
/// network work of several sends overlaps.
pub struct ClientActor<S: Store, T: Transport> {
    client: ApiClient<S, T>,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    in_flight: HashMap<u64, InFlight>,
}

impl<S: Store, T: Transport> ClientActor<S, T> {
    pub fn new(client: ApiClient<S, T>, network_tx: mpsc::UnboundedSender<NetworkCommand>) -> Self {
        ClientActor {
            client,
            network_tx,
            in_flight: HashMap::new(),
        }
    }

    /// Start the client and network actors and return a handle to them
    pub fn spawn(client: ApiClient<S, T>) -> ClientHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientCommand>();
        let (net_cmd_tx, net_cmd_rx) = mpsc::unbounded_channel::<NetworkCommand>();
        let (net_resp_tx, net_resp_rx) = mpsc::unbounded_channel::<NetworkResponse>();

        let network_actor = NetworkActor::new(Arc::clone(client.transport()), net_resp_tx);
        tokio::spawn(network_actor.run(net_cmd_rx));

        let client_actor = ClientActor::new(client, net_cmd_tx);
        tokio::spawn(client_actor.run(cmd_rx, net_resp_rx));

        ClientHandle { tx: cmd_tx }
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(ClientCommand::Shutdown { reply }) => {
                            self.stop(&mut net_rx).await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        // Every handle dropped
                        None => {
                            self.stop(&mut net_rx).await;
                            break;
                        }
                    }
                }
                Some(response) = net_rx.recv() => {
                    self.complete(response).await;
                }
            }
        }
        tracing::debug!("Client actor stopped");
    }

    async fn handle_command(&mut self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::Send { request, reply } => self.start_send(request, reply).await,

            // Requests
            ClientCommand::CreateRequest { collection_id, reply } => {
                let _ = reply.send(self.client.create_request(collection_id.as_deref()).await);
            }
            ClientCommand::UpdateRequest { request, reply } => {
                let _ = reply.send(self.client.update_request(request).await);
            }
            ClientCommand::DeleteRequest { id, reply } => {
                let _ = reply.send(self.client.delete_request(&id).await);
            }
            ClientCommand::DuplicateRequest { id, reply } => {
                let _ = reply.send(self.client.duplicate_request(&id).await);
            }
            ClientCommand::SetActiveRequest { request } => self.client.set_active_request(request),

            // Collections
            ClientCommand::CreateCollection { name, reply } => {
                let _ = reply.send(self.client.create_collection(name.as_deref()).await);
            }
            ClientCommand::UpdateCollection { collection, reply } => {
                let _ = reply.send(self.client.update_collection(collection).await);
            }
            ClientCommand::DeleteCollection { id, reply } => {
                let _ = reply.send(self.client.delete_collection(&id).await);
            }

            // Environments
            ClientCommand::CreateEnvironment { name, reply } => {
                let _ = reply.send(self.client.create_environment(name.as_deref()).await);
            }
            ClientCommand::UpdateEnvironment { environment, reply } => {
                let _ = reply.send(self.client.update_environment(environment).await);
            }
            ClientCommand::SetActiveEnvironment { id, reply } => {
                let _ = reply.send(self.client.set_active_environment(id.as_deref()).await);
            }
            ClientCommand::DeleteEnvironment { id, reply } => {
                let _ = reply.send(self.client.delete_environment(&id).await);
            }

            // Variables and history
            ClientCommand::UpdateGlobals { variables, reply } => {
                let _ = reply.send(self.client.update_global_variables(variables).await);
            }
            ClientCommand::ClearHistory { reply } => {
                let _ = reply.send(self.client.clear_history().await);
            }

            ClientCommand::Snapshot { reply } => {
                let _ = reply.send(self.client.state().clone());
            }
            ClientCommand::Shutdown { reply } => {
                // handled by the loop
                let _ = reply.send(());
            }
        }
    }

    async fn start_send(&mut self, request: ApiRequest, reply: oneshot::Sender<ApiResponse>) {
        let pending = self.client.begin_send(&request);
        let send_id = pending.send_id;

        let cmd = NetworkCommand::Execute {
            id: send_id,
            request: pending.compiled,
        };
        if self.network_tx.send(cmd).is_err() {
            let invocation = Invocation::failed("Network actor is not running");
            let response = self
                .client
                .finish_send(send_id, &pending.snapshot, invocation)
                .await;
            let _ = reply.send(response);
            return;
        }

        self.in_flight.insert(
            send_id,
            InFlight {
                snapshot: pending.snapshot,
                reply,
            },
        );
    }

    async fn complete(&mut self, response: NetworkResponse) {
        let Some(in_flight) = self.in_flight.remove(&response.id) else {
            tracing::warn!(id = response.id, "Response for unknown send");
            return;
        };
        let api_response = self
            .client
            .finish_send(response.id, &in_flight.snapshot, response.invocation)
            .await;
        let _ = in_flight.reply.send(api_response);
    }

    /// Let in-flight sends finish, then stop the network actor
    async fn stop(&mut self, net_rx: &mut mpsc::UnboundedReceiver<NetworkResponse>) {
        while !self.in_flight.is_empty() {
            match net_rx.recv().await {
                Some(response) => self.complete(response).await,
                None => break,
            }
        }

        let orphaned: Vec<u64> = self.in_flight.keys().copied().collect();
        for id in orphaned {
            if let Some(in_flight) = self.in_flight.remove(&id) {
                let invocation = Invocation::failed("Network actor stopped before responding");
                let response = self.client.finish_send(id, &in_flight.snapshot, invocation).await;
                let _ = in_flight.reply.send(response);
            }
        }

        let _ = self.network_tx.send(NetworkCommand::Shutdown);
    }
}

/// Cloneable front door to a running [`ClientActor`]
#[derive(Clone, Debug)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<ClientCommand>,
}

impl ClientHandle {
    async fn call<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> ClientCommand) -> anyhow::Result<R> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| anyhow!("Client actor is not running"))?;
        rx.await.context("Client actor dropped the request")
    }

    /// Send a request through the full pipeline. The response is the
    /// synthetic status-0 one when the transport failed.
    pub async fn send(&self, request: ApiRequest) -> anyhow::Result<ApiResponse> {
        self.call(|reply| ClientCommand::Send { request, reply }).await
    }

    pub async fn create_request(&self, collection_id: Option<String>) -> anyhow::Result<ApiRequest> {
        self.call(|reply| ClientCommand::CreateRequest { collection_id, reply })
            .await?
    }

    pub async fn update_request(&self, request: ApiRequest) -> anyhow::Result<ApiRequest> {
        self.call(|reply| ClientCommand::UpdateRequest { request, reply })
            .await?
    }

    pub async fn delete_request(&self, id: impl Into<String>) -> anyhow::Result<()> {
        let id = id.into();
        self.call(|reply| ClientCommand::DeleteRequest { id, reply }).await?
    }

    pub async fn duplicate_request(&self, id: impl Into<String>) -> anyhow::Result<Option<ApiRequest>> {
        let id = id.into();
        self.call(|reply| ClientCommand::DuplicateRequest { id, reply })
            .await?
    }

    pub fn set_active_request(&self, request: Option<ApiRequest>) -> anyhow::Result<()> {
        self.tx
            .send(ClientCommand::SetActiveRequest { request })
            .map_err(|_| anyhow!("Client actor is not running"))
    }

    pub async fn create_collection(&self, name: Option<String>) -> anyhow::Result<Collection> {
        self.call(|reply| ClientCommand::CreateCollection { name, reply })
            .await?
    }

    pub async fn update_collection(&self, collection: Collection) -> anyhow::Result<Collection> {
        self.call(|reply| ClientCommand::UpdateCollection { collection, reply })
            .await?
    }

    pub async fn delete_collection(&self, id: impl Into<String>) -> anyhow::Result<()> {
        let id = id.into();
        self.call(|reply| ClientCommand::DeleteCollection { id, reply })
            .await?
    }

    pub async fn create_environment(&self, name: Option<String>) -> anyhow::Result<Environment> {
        self.call(|reply| ClientCommand::CreateEnvironment { name, reply })
            .await?
    }

    pub async fn update_environment(&self, environment: Environment) -> anyhow::Result<Environment> {
        self.call(|reply| ClientCommand::UpdateEnvironment { environment, reply })
            .await?
    }

    pub async fn set_active_environment(&self, id: Option<String>) -> anyhow::Result<()> {
        self.call(|reply| ClientCommand::SetActiveEnvironment { id, reply })
            .await?
    }

    pub async fn delete_environment(&self, id: impl Into<String>) -> anyhow::Result<()> {
        let id = id.into();
        self.call(|reply| ClientCommand::DeleteEnvironment { id, reply })
            .await?
    }

    pub async fn update_global_variables(&self, variables: Vec<KeyValuePair>) -> anyhow::Result<()> {
        self.call(|reply| ClientCommand::UpdateGlobals { variables, reply })
            .await?
    }

    pub async fn clear_history(&self) -> anyhow::Result<()> {
        self.call(|reply| ClientCommand::ClearHistory { reply }).await?
    }

    pub async fn snapshot(&self) -> anyhow::Result<ClientState> {
        self.call(|reply| ClientCommand::Snapshot { reply }).await
    }

    /// Wait for in-flight sends to finish and stop both actors
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.call(|reply| ClientCommand::Shutdown { reply }).await
    }
}
