//! Network layer - request execution off the client's task
//!
//! The network actor receives compiled requests and sends back timed outcomes.

pub mod actor;
pub mod transport;

pub use actor::NetworkActor;
pub use transport::{
    invoke, HttpTransport, Invocation, RawResponse, Transport, TransportError, TransportOutcome,
};
