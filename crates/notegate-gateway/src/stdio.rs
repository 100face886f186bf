//! stdio transport: newline-delimited JSON-RPC over stdin/stdout.
//!
//! The HTTP admission gates do not apply here; the caller already owns
//! the process. Audit entries use `local` as the client identity.

use crate::dispatch::Dispatcher;
use notegate_core::NotegateResult;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

const STDIO_CLIENT: &str = "local";

/// Serve requests from stdin until EOF, one JSON-RPC message per line.
/// Notifications produce no output line.
pub async fn serve_stdio(dispatcher: Arc<Dispatcher>) -> NotegateResult<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    info!("serving on stdio");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(response) = dispatcher.dispatch(STDIO_CLIENT, line.as_bytes()).await {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            stdout.write_all(&out).await?;
            stdout.flush().await?;
        }
    }
    info!("stdin closed, shutting down");
    Ok(())
}
