//! Network actor - runs compiled requests on the Tokio runtime

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::transport::{invoke, Invocation, Transport};

/// Network actor that executes requests concurrently and reports each
/// outcome back tagged with its send id
pub struct NetworkActor<T: Transport> {
    transport: Arc<T>,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    active_requests: JoinSet<()>,
}

impl<T: Transport> NetworkActor<T> {
    pub fn new(transport: Arc<T>, response_tx: mpsc::UnboundedSender<NetworkResponse>) -> Self {
        NetworkActor {
            transport,
            response_tx,
            active_requests: JoinSet::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Execute { id, request }) => {
                            let response_tx = self.response_tx.clone();
                            let transport = Arc::clone(&self.transport);

                            self.active_requests.spawn(async move {
                                tracing::info!(id, url = %request.url, method = %request.method, "Executing request");
                                // A panicking transport still answers for its send id
                                let invocation = match AssertUnwindSafe(invoke(transport.as_ref(), request))
                                    .catch_unwind()
                                    .await
                                {
                                    Ok(invocation) => invocation,
                                    Err(panic) => {
                                        let reason = panic_message(panic.as_ref());
                                        tracing::error!(id, reason = %reason, "Transport panicked");
                                        Invocation::failed(format!("Transport panicked: {}", reason))
                                    }
                                };
                                match &invocation.outcome {
                                    Ok(raw) => tracing::info!(id, status = raw.status, elapsed = ?invocation.elapsed, "Request completed"),
                                    Err(e) => tracing::warn!(id, error = %e, "Request failed"),
                                }
                                let _ = response_tx.send(NetworkResponse { id, invocation });
                            });
                        }

                        Some(NetworkCommand::Shutdown) | None => {
                            while self.active_requests.join_next().await.is_some() {}
                            break;
                        }
                    }
                }

                // Clean up completed tasks
                Some(_result) = self.active_requests.join_next() => {}
            }
        }
        tracing::debug!("Network actor stopped");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
