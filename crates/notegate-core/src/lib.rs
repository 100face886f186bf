//! Core types shared across the Notegate crates.
//!
//! Notegate exposes a local note vault's REST API as MCP-style JSON-RPC
//! tools. This crate holds what every other crate needs:
//!
//! - [`NotegateError`]: unified error enum for all subsystems.
//! - [`NotegateResult`]: convenience alias for `Result<T, NotegateError>`.
//! - [`protocol`]: JSON-RPC 2.0 envelope and response types.
//! - [`Tool`]: the closed catalogue of vault tools.

/// JSON-RPC 2.0 message types.
pub mod protocol;
/// The fixed tool catalogue.
pub mod tool;

pub use tool::{Tool, ToolDef};

/// Top-level error type for Notegate.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum NotegateError {
    /// An error from the API gateway layer.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// A non-success response or transport failure from the vault backend.
    #[error("Vault error: {0}")]
    Vault(String),

    /// A security-related error (admission, rate limiting).
    #[error("Security error: {0}")]
    Security(String),

    /// A rejected path or folder argument.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A tool call missing one of its required arguments.
    #[error("missing or invalid {0} parameter")]
    MissingArgument(&'static str),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the workspace.
pub type NotegateResult<T> = Result<T, NotegateError>;
