//! Coaching service HTTP server binary.
//!
//! Loads configuration from `--config <path>` or the default location,
//! opens the session store when enabled, and serves the API until
//! interrupted. All tracing output goes to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use braindoc::config::Config;
use braindoc::engine::CoachEngine;
use braindoc::llm::LlmClient;
use braindoc::server::CoachServer;
use braindoc::store::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = load_config()?;
    config.apply_env_overrides();

    let api_key = config.llm.api_key.resolve()?;
    if api_key.is_empty() {
        tracing::warn!("no API key configured; provider requests go out unauthenticated");
    }

    let store = if config.store.enabled {
        let dir = config.store.data_dir();
        let store = SessionStore::open(&dir)?;
        tracing::info!(path = %store.root().display(), "session store open");
        Some(Arc::new(store))
    } else {
        tracing::info!("session store disabled");
        None
    };

    let engine = CoachEngine::new(LlmClient::new(&config.llm, api_key));
    tracing::info!(model = engine.model(), "engine ready");

    let server = CoachServer::start(&config, engine, store).await?;
    tracing::info!(addr = %server.addr(), "serving");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    Ok(())
}

/// Parse arguments and load configuration. A missing default config file
/// just means defaults; an explicitly named file must exist.
fn load_config() -> anyhow::Result<Config> {
    let mut args = std::env::args().skip(1);
    let mut explicit: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                explicit = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("unknown argument: {other} (supported: --config <path>)"),
        }
    }

    match explicit {
        Some(path) => Ok(Config::from_file(&path)?),
        None => {
            let path = Config::default_config_path();
            if path.exists() {
                Ok(Config::from_file(&path)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}
