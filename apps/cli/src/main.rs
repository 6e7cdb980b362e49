//! PeerShare terminal client entry point.

mod camera;
mod commands;
mod config;
mod terminal;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use peershare_protocol::ShareConfig;

use config::ClientConfig;

#[derive(Parser)]
#[command(name = "peershare", version)]
#[command(about = "PeerShare - send files between nearby devices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server base URL (overrides the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Config file (default: ~/.config/peershare/client.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "peershare_pages=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register this device and wait for incoming transfers
    Listen {
        /// Name to register under (default: config `device_name`)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show a share link as a QR code and notify other devices
    Share {
        /// Link the receiving device should open
        link: String,

        /// Transfer id to offer
        #[arg(long)]
        transfer: String,

        /// Transfer token to offer
        #[arg(long)]
        token: String,

        /// Also write the QR code as SVG to this file
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Open a transfer from a photo of the sender's QR code
    Receive {
        /// PNG or JPEG image containing the QR code
        image: PathBuf,

        /// Seconds to keep scanning before giving up
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },

    /// List registered devices
    Devices,
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,peershare=debug")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let mut client_config = match ClientConfig::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, path = %config_path.display(), "failed to load config, using defaults");
            ClientConfig::default()
        }
    };
    if let Some(server) = cli.server {
        client_config.server_url = server;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %client_config.server_url,
        "starting PeerShare client"
    );

    match cli.command {
        Commands::Listen { name } => commands::listen(&client_config, name).await,
        Commands::Share {
            link,
            transfer,
            token,
            svg,
        } => {
            let share = ShareConfig {
                share_link: link,
                transfer_id: transfer,
                token,
            };
            commands::share(&client_config, share, svg).await
        }
        Commands::Receive { image, timeout } => {
            commands::receive(&image, Duration::from_secs(timeout)).await
        }
        Commands::Devices => commands::devices(&client_config).await,
    }
}
