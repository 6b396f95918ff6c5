//! Message types for inter-actor communication.
//!
//! This module defines all messages that flow between the client handle, the
//! client actor and the network actor.

pub mod client;
pub mod network;

pub use client::{ClientCommand, Reply};
pub use network::{NetworkCommand, NetworkResponse};
