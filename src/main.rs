//! API Architect - CLI Entry Point

use anyhow::{Context, Result};
use api_architect::server::{control_router, mock_router, AppState};
use api_architect::session::SessionLogging;
use api_architect::transport::HttpTransport;
use api_architect::{ArchitectConfig, MockSessionController, SpecOrchestrator};
use clap::Parser;
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "api-architect",
    about = "API contract orchestration and mock serving",
    version
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "api-architect.yaml")]
    config: PathBuf,

    /// Control API port (overrides the configuration file)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        println!("{}", api_architect::config::DEFAULT_CONFIG_YAML);
        return Ok(());
    }

    // Load configuration
    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        ArchitectConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration");
        ArchitectConfig::default()
    };

    let mut config = config.with_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    if args.validate {
        println!("Configuration is valid");
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP client")?);
    let session = Arc::new(MockSessionController::with_logging(
        config.mock.base_url(),
        SessionLogging {
            log_matches: config.settings.log_matches,
            log_unmatched: config.settings.log_unmatched,
        },
    ));
    let state = Arc::new(AppState {
        orchestrator: SpecOrchestrator::new(
            transport,
            config.collaborators.clone(),
            config.fallbacks.clone(),
        ),
        session: session.clone(),
    });

    let control_addr = format!("{}:{}", config.server.host, config.server.port);
    let mock_addr = format!("{}:{}", config.mock.host, config.mock.port);
    let control_listener = TcpListener::bind(&control_addr)
        .await
        .with_context(|| format!("Failed to bind control API on {}", control_addr))?;
    let mock_listener = TcpListener::bind(&mock_addr)
        .await
        .with_context(|| format!("Failed to bind mock listener on {}", mock_addr))?;

    info!(
        control = %control_addr,
        mock = %mock_addr,
        mock_url = %config.mock.base_url(),
        generator = %config.collaborators.generator.endpoint(),
        "Starting API architect"
    );

    let control = axum::serve(
        control_listener,
        control_router(state, config.settings.cors_permissive),
    );
    let mock = axum::serve(mock_listener, mock_router(session));

    tokio::select! {
        result = control.into_future() => result.context("Control API stopped")?,
        result = mock.into_future() => result.context("Mock listener stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    Ok(())
}
