//! `embedsmith` -- Discord embed composer bot.
//!
//! Subcommands:
//!
//! - `embedsmith run` -- connect to the Gateway and serve `/embed`.
//! - `embedsmith register` -- register the `/embed` command explicitly.
//! - `embedsmith status` -- show configuration diagnostics.

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use embedsmith::api::ApiClient;
use embedsmith::config::Config;
use embedsmith::flow::App;
use embedsmith::gateway::GatewayClient;

/// Discord embed composer bot.
#[derive(Parser)]
#[command(name = "embedsmith", about = "Discord embed composer bot", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path.
    #[arg(short, long, global = true, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Connect to the Gateway and serve the /embed command.
    Run,

    /// Register the /embed command (global, or guild-scoped when
    /// `guild_id` is configured). Requires `application_id` in the config.
    Register,

    /// Show configuration diagnostics.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config = Config::load(Path::new(&cli.config))?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::Register => register(config).await?,
        Commands::Status => status(&cli.config, &config),
    }

    Ok(())
}

/// Connect and serve until Ctrl-C.
async fn run(config: Config) -> anyhow::Result<()> {
    let token = config.require_token()?.expose().to_owned();
    let api = Arc::new(ApiClient::new(token));
    let app = Arc::new(App::new(config, api));
    let gateway = GatewayClient::new(app);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    gateway.run(cancel).await?;
    Ok(())
}

/// Register the /embed command using the configured application id.
async fn register(config: Config) -> anyhow::Result<()> {
    let token = config.require_token()?.expose().to_owned();
    let application_id = config
        .application_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("`application_id` must be set in the config to register"))?;

    let api: Arc<dyn embedsmith::api::DiscordApi> = Arc::new(ApiClient::new(token));
    let app = App::new(config, api);
    app.register_commands(&application_id).await?;

    println!("Registered /embed for application {application_id}.");
    Ok(())
}

/// Print configuration diagnostics.
fn status(path: &str, config: &Config) {
    println!("config file:     {path}");
    println!(
        "token:           {}",
        if config.token.is_empty() { "NOT SET" } else { "set" }
    );
    println!(
        "authorization:   {}",
        match config.admin_role_id.as_deref() {
            Some(role) => format!("restricted to role {role}"),
            None => "unrestricted".into(),
        }
    );
    println!(
        "application_id:  {}",
        config.application_id.as_deref().unwrap_or("(from READY)")
    );
    println!(
        "registration:    {}",
        match config.guild_id.as_deref() {
            Some(guild) => format!("guild {guild}"),
            None => "global".into(),
        }
    );
    println!("gateway url:     {}", config.gateway_url);
    println!("intents:         {}", config.intents);
}
