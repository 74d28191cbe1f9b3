use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use famledger_runtime_config::{CONFIG_FILE_NAME, FamledgerConfig, StorageBackend};
use famledger_server::{AppState, app, service_config, sweeper};

#[derive(Parser)]
#[command(name = "famledger-server", version, about = "Family budget server")]
struct Cli {
    /// Path to the TOML config file. Missing files fall back to defaults.
    #[arg(short, long, env = "FAMLEDGER_CONFIG", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Storage backend override (sqlite, postgres, mongo).
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply schema migrations / create indexes, then exit.
    Migrate,
    /// Expire overdue invites and purge settled ones once, then exit.
    SweepInvites,
}

fn load_config(cli: &Cli) -> anyhow::Result<FamledgerConfig> {
    let mut cfg = FamledgerConfig::load(&cli.config)?;
    cfg.apply_env()?;
    if let Some(backend) = cli.storage {
        cfg.storage.backend = backend;
    }
    if let Some(Command::Serve { host, port }) = &cli.command {
        if let Some(host) = host {
            cfg.server.host = host.clone();
        }
        if let Some(port) = port {
            cfg.server.port = *port;
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter)),
        )
        .init();
    tracing::info!("config: {} (storage: {})", cli.config.display(), cfg.storage.backend);

    match cli.command {
        Some(Command::Migrate) => {
            famledger_store::migrate(&cfg.storage).await?;
            tracing::info!("migrations complete");
            Ok(())
        }
        Some(Command::SweepInvites) => {
            let store = famledger_store::connect(&cfg.storage).await?;
            let (expired, purged) = sweeper::run_once(&store.repos, &cfg.invites).await;
            println!("expired {expired} invite(s), purged {purged}");
            Ok(())
        }
        Some(Command::Serve { .. }) | None => serve(cfg).await,
    }
}

async fn serve(cfg: FamledgerConfig) -> anyhow::Result<()> {
    if cfg.auth.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET not set: logins will be rejected");
    }

    let store = famledger_store::connect(&cfg.storage)
        .await
        .context("connecting to storage")?;
    let _sweep = sweeper::spawn(store.repos.clone(), cfg.invites.clone());

    let state = AppState::new(store.repos, service_config(&cfg), store.backend);
    let app = app(state, &cfg.server.cors_origins);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("starting server at http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
