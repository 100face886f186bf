use clap::{Parser, Subcommand};
use notegate_core::Tool;
use notegate_gateway::{AdmissionState, Dispatcher, GatewayServer};
use notegate_security::{AuditLog, RateLimiter, SecurityPolicy};
use notegate_vault::VaultClient;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notegate", about = "Notegate: JSON-RPC gateway for a note vault")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "notegate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Serve JSON-RPC over stdin/stdout instead of HTTP
        #[arg(long)]
        stdio: bool,
    },
    /// Inspect the tool catalogue
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// List the exposed tools
    List,
}

#[derive(Deserialize, Default)]
struct NotegateConfig {
    #[serde(default)]
    vault: VaultConfig,
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    security: SecurityPolicy,
}

#[derive(Deserialize)]
struct VaultConfig {
    #[serde(default = "default_vault_url")]
    base_url: String,
    #[serde(default)]
    token: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: default_vault_url(),
            token: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_vault_url() -> String {
    "http://localhost:27123".to_string()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8080
}

/// Load config from the given path, falling back to defaults when the
/// file does not exist. Environment variables override the vault settings.
async fn load_config(path: &Path) -> anyhow::Result<NotegateConfig> {
    let mut config = match tokio::fs::read_to_string(path).await {
        Ok(text) => toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {e}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => NotegateConfig::default(),
        Err(e) => {
            return Err(anyhow::anyhow!(
                "Failed to read config file '{}': {e}",
                path.display()
            ))
        }
    };

    if let Ok(token) = std::env::var("NOTEGATE_VAULT_TOKEN") {
        if !token.is_empty() {
            config.vault.token = token;
        }
    }
    if let Ok(url) = std::env::var("NOTEGATE_VAULT_URL") {
        if !url.is_empty() {
            config.vault.base_url = url;
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port, stdio } => {
            let vault = Arc::new(VaultClient::new(
                &config.vault.base_url,
                &config.vault.token,
            ));
            let audit = Arc::new(AuditLog::from_env(config.data_dir.join("audit")));
            let dispatcher = Arc::new(Dispatcher::new(vault, audit.clone()));

            info!(vault_url = %config.vault.base_url, "Vault API endpoint");
            if audit.is_enabled() {
                info!("Audit log: ENABLED");
            }

            if stdio {
                return Ok(notegate_gateway::stdio::serve_stdio(dispatcher).await?);
            }

            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            if config.security.enable_auth {
                info!("Authentication: ENABLED");
            }
            if !config.security.allowed_ips.is_empty() {
                info!(ips = ?config.security.allowed_ips, "IP allow-list: ENABLED");
            }
            if config.security.enable_rate_limit {
                info!(
                    per_minute = config.security.rate_limit_per_minute,
                    "Rate limit: ENABLED"
                );
            }

            let admission = Arc::new(AdmissionState {
                policy: config.security,
                limiter: Arc::new(RateLimiter::default()),
                audit,
            });
            let app = GatewayServer::build(dispatcher, admission);

            let addr = format!("{host}:{port}");
            info!("Starting Notegate gateway on {addr}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
        }
        Commands::Tools {
            action: ToolsAction::List,
        } => {
            for tool in Tool::ALL {
                println!("{:<16} {}", tool.name(), tool.description());
            }
        }
    }

    Ok(())
}
