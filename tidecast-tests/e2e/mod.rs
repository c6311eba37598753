//! End-to-end tests for Tidecast
//!
//! These tests drive the full requester workflow through chat messages:
//! download, chunk listing, retrieval by name, and flush.

mod workflow;
