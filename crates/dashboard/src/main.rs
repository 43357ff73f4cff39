use anyhow::{Context, Result};
use clap::Parser;
use portico_core::Settings;
use portico_core::tracing::{config::InstrumentationConfig, init::init_tracing};
use portico_dashboard::{DashboardState, serve, shutdown_signal};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Portico - admin dashboard session bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short = 'b', long = "bind")]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        settings.server.bind_addr = bind;
    }

    init_tracing(&InstrumentationConfig::for_service(
        "portico",
        &settings.server.log_level,
        settings.server.log_json,
    ))?;

    info!(
        backend = %settings.backend.url,
        secret = %settings.session.secret,
        allowed_roles = ?settings.session.allowed_roles,
        secure_cookie = settings.server.secure_cookie,
        "Configuration loaded"
    );

    let state = DashboardState::from_settings(&settings).context("failed to build backend client")?;
    serve(settings.server.bind_addr, state, shutdown_signal()).await
}
