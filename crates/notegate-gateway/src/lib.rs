//! Gateway for the note vault: JSON-RPC dispatch behind an ordered set of
//! admission gates, served over HTTP or stdio.

pub mod admission;
pub mod dispatch;
pub mod server;
pub mod stdio;

pub use admission::{AdmissionState, ClientIp};
pub use dispatch::Dispatcher;
pub use server::GatewayServer;
