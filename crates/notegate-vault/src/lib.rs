//! HTTP client for the note vault REST API.
//!
//! All operations return human-readable markdown summaries rather than raw
//! payloads, since the consumer is a tool-calling agent rather than a UI.

pub mod client;

pub use client::{VaultApi, VaultClient};
