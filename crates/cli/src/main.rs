use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Telegram webhook relay to an OpenAI-compatible completion API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the HTTP server (GET / health, POST /webhook).
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Bind address (default from config or 127.0.0.1)
        #[arg(long, short)]
        bind: Option<String>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Register URL as the bot's webhook with Telegram.
    SetWebhook {
        /// Public URL of this server's /webhook route.
        url: String,

        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Remove the bot's webhook registration.
    DeleteWebhook {
        /// Config file path (default: RELAY_CONFIG_PATH or ~/.relay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring .env: {}", e);
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, bind, port }) => {
            if let Err(e) = run_serve(config, bind, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::SetWebhook { url, config }) => {
            if let Err(e) = run_set_webhook(config, &url).await {
                log::error!("set-webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::DeleteWebhook { config }) => {
            if let Err(e) = run_delete_webhook(config).await {
                log::error!("delete-webhook failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<PathBuf>,
    bind: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    log::debug!("config: {}", path.display());
    if let Some(b) = bind {
        config.gateway.bind = b;
    }
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    relay::gateway::run_gateway(config).await
}

async fn run_set_webhook(config_path: Option<PathBuf>, url: &str) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    let telegram = relay::gateway::telegram_channel(&config);
    telegram.set_webhook(url).await?;
    println!("webhook set to {}", url);
    Ok(())
}

async fn run_delete_webhook(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    let telegram = relay::gateway::telegram_channel(&config);
    telegram.delete_webhook().await?;
    println!("webhook deleted");
    Ok(())
}
