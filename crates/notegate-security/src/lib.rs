//! Security building blocks for the Notegate gateway.
//!
//! - [`SecurityPolicy`]: immutable admission policy loaded at startup.
//! - [`RateLimiter`]: per-client sliding-window rate limiting.
//! - [`validate`]: path deny-list and content sanitization.
//! - [`AuditLog`]: append-only, fire-and-forget audit stream.

pub mod audit;
pub mod policy;
pub mod rate_limit;
pub mod validate;

pub use audit::{AuditLog, AuditOutcome};
pub use policy::SecurityPolicy;
pub use rate_limit::RateLimiter;
pub use validate::{sanitize_content, validate_path};
