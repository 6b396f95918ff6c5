//! App layer - the client orchestrator and the actor that drives it
//!
//! `ApiClient` holds the state and implements every operation; `ClientActor`
//! serializes access to it and lets sends overlap on the network actor.

pub mod actor;
pub mod client;

pub use actor::{ClientActor, ClientHandle};
pub use client::{ApiClient, ClientState, PendingSend};
