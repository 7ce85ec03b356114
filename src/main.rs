use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use certdesk::policy::CaPolicy;
use certdesk::server;
use certdesk::store::{CaStore, FileRepository};

#[derive(Debug, Parser)]
#[command(name = "certdesk")]
#[command(about = "Certificate authority and client certificate issuing service")]
struct Config {
    /// Address to listen on
    #[arg(long, env = "CERTDESK_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    /// Directory holding CA material and issued bundles
    #[arg(long, env = "CERTDESK_DATA_DIR", default_value = "./certificates")]
    data_dir: PathBuf,

    /// Emit logs as JSON
    #[arg(long, env = "CERTDESK_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_json)?;

    let repository = FileRepository::open(&config.data_dir).with_context(|| {
        format!("Failed to open data directory {}", config.data_dir.display())
    })?;
    let store = Arc::new(CaStore::new(repository, CaPolicy::default()));
    let app = server::router(store);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!(addr = %config.listen, data_dir = %config.data_dir.display(), "certdesk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("certdesk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let initialised = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    initialised.context("Failed to initialise logging")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::try_parse_from(["certdesk"]).unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("./certificates"));
    }

    #[test]
    fn config_flags() {
        let config = Config::try_parse_from([
            "certdesk",
            "--listen",
            "0.0.0.0:8443",
            "--data-dir",
            "/var/lib/certdesk",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(config.listen.port(), 8443);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/certdesk"));
        assert!(config.log_json);
    }
}
