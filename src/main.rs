//! ERGenix: ER diagrams for MySQL, PostgreSQL and SQLite schemas.
//!
//! `ergenix serve` runs the JSON web API; `ergenix render` draws a schema
//! description file offline.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ergenix::api::{AppState, Router, Server};
use ergenix::config::{RenderConfig, ServerConfig};
use ergenix::ir::{TablesData, relationships_within};
use ergenix::raster::Rasterizer;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Render a tables_data JSON file to PNG or SVG
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Seconds a database connection stays usable after /connect
    #[arg(long, default_value_t = 300)]
    connection_ttl_secs: u64,

    /// Seconds between sweeps of expired connections
    #[arg(long, default_value_t = 60)]
    sweep_interval_secs: u64,

    /// Request body timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Raster scale factor for generated diagrams
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON file mapping table name to {schema, foreign_keys}
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write SVG instead of PNG
    #[arg(long)]
    svg: bool,

    /// Diagram title
    #[arg(long)]
    title: Option<String>,

    /// Raster scale factor
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ergenix=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Render(args) => render(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.host, args.port))?;

    let config = ServerConfig {
        addr,
        connection_ttl: Duration::from_secs(args.connection_ttl_secs),
        sweep_interval: Duration::from_secs(args.sweep_interval_secs.max(1)),
        request_timeout: Duration::from_millis(args.request_timeout_ms),
        render: RenderConfig {
            scale: args.scale,
            ..RenderConfig::default()
        },
    };

    let router = Router::new(AppState::new(config));
    Server::new(router)
        .serve(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("server failed")
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let tables: TablesData = serde_json::from_str(&input)
        .with_context(|| format!("{} is not a valid tables_data document", args.input.display()))?;
    let relationships = relationships_within(&tables);

    let mut config = RenderConfig {
        scale: args.scale,
        ..RenderConfig::default()
    };
    if let Some(title) = args.title {
        config.title = title;
    }

    let bytes = if args.svg {
        ergenix::render_svg(&tables, &relationships, &config)?.into_bytes()
    } else {
        ergenix::render_png(&tables, &relationships, &Rasterizer::new(), &config)?
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                output = %path.display(),
                tables = tables.len(),
                relationships = relationships.len(),
                "diagram written"
            );
        }
        None => std::io::stdout().lock().write_all(&bytes)?,
    }
    Ok(())
}
