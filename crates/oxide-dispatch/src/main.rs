//! oxide-dispatch CLI
//!
//! Loads a route manifest and dispatches requests against it in memory,
//! without opening a socket.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use oxide_dispatch::{Manifest, Method, Request};

/// Inspect a route manifest and dispatch requests against it.
#[derive(Parser)]
#[command(name = "oxide-dispatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Route manifest (JSON).
    #[arg(short, long, env = "OXIDE_DISPATCH_MANIFEST", default_value = "routes.json")]
    manifest: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered routes.
    Routes,

    /// Dispatch one request and print the response.
    Request {
        /// HTTP method.
        method: String,

        /// Request target, path plus optional query string.
        target: String,

        /// Request header as `Name: value`. Repeatable.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body.
        #[arg(short, long)]
        body: Option<String>,

        /// Peer address as `host:port`.
        #[arg(long)]
        remote_addr: Option<String>,
    },
}

/// `--verbose` forces debug output, otherwise `RUST_LOG` decides and
/// defaults to info.
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.verbose))
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let manifest = Manifest::from_path(&cli.manifest)
        .with_context(|| format!("loading {}", cli.manifest.display()))?;
    let engine = manifest.build()?;
    debug!(routes = engine.routes().len(), "manifest loaded");

    match cli.command {
        Commands::Routes => {
            for route in engine.routes() {
                println!("{:<7} {}", route.method, route.pattern);
            }
        }

        Commands::Request {
            method,
            target,
            headers,
            body,
            remote_addr,
        } => {
            let method: Method = method.parse()?;
            let mut request = Request::new(method, target);
            for header in &headers {
                let Some((name, value)) = header.split_once(':') else {
                    bail!("header {header:?} is not of the form `Name: value`");
                };
                request = request.header(name.trim(), value.trim());
            }
            if let Some(body) = body {
                request = request.body(body);
            }
            if let Some(addr) = remote_addr {
                request = request.remote_addr(addr);
            }

            let response = engine.handle(request);
            println!("HTTP/1.1 {} {}", response.status, response.status_text());
            let mut headers: Vec<_> = response.headers.iter().collect();
            headers.sort();
            for (name, value) in headers {
                println!("{name}: {value}");
            }
            println!();
            println!("{}", String::from_utf8_lossy(&response.body));
        }
    }

    Ok(())
}
