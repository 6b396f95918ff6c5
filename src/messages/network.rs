//! Network messages - communication between the client and network actors

use crate::compiler::CompiledRequest;
use crate::network::Invocation;

/// Commands sent from the client actor to the network actor
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    /// Issue a compiled request; the result comes back tagged with `id`
    Execute { id: u64, request: CompiledRequest },
    /// Finish in-flight requests, then stop
    Shutdown,
}

/// Result of one execution, sent from the network actor to the client actor
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    pub id: u64,
    pub invocation: Invocation,
}
