mod cli;

use satsnap::{
    config,
    images::{show_image_path, ImageStore},
    imagery::SentinelHubProvider,
    server,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting satsnap server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "satsnap=trace,satsnap_common=debug,tower_http=debug".to_string()
        } else {
            "satsnap=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Fetch => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch_once(cli.config.as_deref()))
        }
        Commands::Lookup { timestamp } => lookup(timestamp, cli.config.as_deref()),
        Commands::List => list(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("satsnap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn fetch_once(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let provider = Arc::new(SentinelHubProvider::from_config(&config.imagery));
    let ctx = server::AppContext::new(config, provider)?;

    let stored = ctx.images.fetch_and_save().await?;
    println!("{}", show_image_path(stored.timestamp));
    Ok(())
}

fn open_store(config_path: Option<&std::path::Path>) -> Result<ImageStore> {
    let config = config::load_config_or_default(config_path)?;
    Ok(ImageStore::open(&config.storage.image_dir)?)
}

fn lookup(timestamp: i64, config_path: Option<&std::path::Path>) -> Result<()> {
    let store = open_store(config_path)?;
    match store.lookup(timestamp) {
        Some(stored) => {
            println!("{}", stored.path.display());
            if let Some(record) = store.record(timestamp)? {
                println!("  Size: {}x{}", record.width, record.height);
                println!("  Layer: {} ({})", record.layer, record.data_collection);
                if let Some(acquired) = record.acquired {
                    println!("  Acquired: {}", acquired);
                }
            }
            Ok(())
        }
        None => anyhow::bail!("No image stored for timestamp {}", timestamp),
    }
}

fn list(config_path: Option<&std::path::Path>) -> Result<()> {
    let store = open_store(config_path)?;
    for timestamp in store.list() {
        println!("{}", timestamp);
    }
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Image dir: {}", config.storage.image_dir.display());
            println!(
                "  Imagery: {} / {} {}x{}",
                config.imagery.data_collection,
                config.imagery.layer,
                config.imagery.width,
                config.imagery.height
            );
            println!("  Area: {}", config.imagery.bbox);
            println!(
                "  Instance id: {}",
                if config.imagery.instance_id.is_some() {
                    "configured"
                } else {
                    "missing"
                }
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Area: {}", config.imagery.bbox);
        }
    }

    Ok(())
}
