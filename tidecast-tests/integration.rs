//! Integration tests for Tidecast
//!
//! These tests wire real crate boundaries together: the acquisition engine
//! with simulated external tools, segment delivery over the recording
//! transport, the catalog service, and the chat router on top of all three.

#[path = "integration/acquisition.rs"]
mod acquisition;

#[path = "integration/catalog.rs"]
mod catalog;

#[path = "integration/delivery.rs"]
mod delivery;

#[path = "integration/chat_flow.rs"]
mod chat_flow;
