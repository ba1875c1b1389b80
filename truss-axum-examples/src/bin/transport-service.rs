//! Transport test service.
//!
//! Serves the routes of `truss_axum_examples::service()`:
//! - GET  /getwithquery?A=1&B=2
//! - GET  /getwithrepeatedquery?A=[1,2]
//! - POST /postwithnestedmessagebody  {"NM":{"A":1,"B":2}}
//! - POST /ctxtoctx                   {"Key":"Truss-Auth-Header"}
//! - GET  /error
//!
//! Run with: RUST_LOG=debug cargo run --bin transport-service -- --context-key X-Tenant

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use truss_axum_examples::{AUTH_HEADER, server_addr, service};

#[derive(Debug, Parser)]
#[command(about = "Serve the transport test service over JSON/HTTP")]
struct Args {
    /// Listen address; defaults to 0.0.0.0:$PORT (PORT defaults to 3000).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Additional context keys to read from request headers.
    #[arg(long = "context-key")]
    context_keys: Vec<String>,

    /// Per-call timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut keys = vec![AUTH_HEADER.to_owned()];
    keys.extend(args.context_keys);

    let mut builder = service().context_keys(keys);
    if let Some(ms) = args.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    let router = builder.build()?;

    let addr = match args.addr {
        Some(addr) => addr,
        None => server_addr()?,
    };
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "transport service listening");

    axum::serve(listener, router).await?;
    Ok(())
}
