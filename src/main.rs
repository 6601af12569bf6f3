/// nmc-keyserver - HKP gateway for Namecoin id/ identities
///
/// Serves OpenPGP keyserver lookups for blockchain identities, or answers a
/// single lookup from the command line.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nmc_keyserver::{
    config::ServerConfig, jobs::JobScheduler, lookup::LookupRequest, server, AppContext,
};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about = "HKP keyserver gateway for Namecoin id/ identities")]
struct Cli {
    /// Listen address, overrides KEYSERVER_HOST
    #[arg(long)]
    host: Option<String>,
    /// Listen port, overrides KEYSERVER_PORT
    #[arg(short, long)]
    port: Option<u16>,
    /// Standard keyserver host, overrides KEYSERVER_UPSTREAM
    #[arg(long)]
    upstream: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP keyserver (default)
    Serve,
    /// Print the machine-readable index for a search term
    Index { search: String },
    /// Print the public key for a search term
    Get { search: String },
    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.service.host = host;
    }
    if let Some(port) = cli.port {
        config.service.port = port;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream.host = upstream;
    }

    init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Index { search } => one_shot(config, search, "index").await,
        Command::Get { search } => one_shot(config, search, "get").await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Logs go to stderr so one-shot lookups keep stdout clean
fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("nmc_keyserver={},tower_http=info", config.logging.level).into()
    });

    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    print_banner();

    let ctx = Arc::new(AppContext::new(config)?);

    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;
    Ok(())
}

async fn one_shot(config: ServerConfig, search: String, op: &str) -> Result<()> {
    let ctx = AppContext::new(config)?;
    let body = ctx
        .lookup
        .lookup(&LookupRequest::new(search.clone(), op))
        .await
        .with_context(|| format!("{} lookup for '{}' failed", op, search))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    _  _ __  __  ___   _  __
   | \| |  \/  |/ __| | |/ /___ _  _ ___ ___ _ ___ _____ _ _
   | .` | |\/| | (__  | ' </ -_) || (_-</ -_) '_\ V / -_) '_|
   |_|\_|_|  |_|\___| |_|\_\___|\_, /__/\___|_|  \_/\___|_|
                                |__/
        HKP gateway for Namecoin identities v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
