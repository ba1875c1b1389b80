//! Transport client test.
//!
//! Drives every route of the transport test service through the typed client.
//!
//! Usage:
//!   # First, start the server in another terminal:
//!   cargo run --bin transport-service
//!
//!   # Then run the client (defaults to http://localhost:3000):
//!   cargo run --bin transport-client -- --url http://localhost:3000

use std::time::Duration;

use anyhow::ensure;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use truss_axum::truss_axum_core::CallContext;
use truss_axum_client::TrussClient;
use truss_axum_examples::{
    AUTH_HEADER, Empty, GetWithQueryRequest, GetWithRepeatedQueryRequest, MetaRequest,
    NestedMessage, PostWithNestedMessageBodyRequest, TransportServiceClient,
};

#[derive(Debug, Parser)]
#[command(about = "Call the transport test service")]
struct Args {
    /// Base URL of the service.
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Client-wide timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = TransportServiceClient::new(
        TrussClient::builder(&args.url)
            .ctx_values_to_send([AUTH_HEADER])
            .timeout(Duration::from_millis(args.timeout_ms))
            .build()?,
    );
    let ctx = CallContext::new();

    println!("Test 1: query-bound sum...");
    let resp = client
        .get_with_query(&ctx, &GetWithQueryRequest { a: 47, b: 24 })
        .await?;
    ensure!(resp.v == 71, "expected 71, got {}", resp.v);
    println!("  PASS: V = {}", resp.v);

    println!("Test 2: repeated query...");
    let resp = client
        .get_with_repeated_query(
            &ctx,
            &GetWithRepeatedQueryRequest {
                a: vec![12, 45360],
            },
        )
        .await?;
    ensure!(resp.v == 45372, "expected 45372, got {}", resp.v);
    println!("  PASS: V = {}", resp.v);

    println!("Test 3: nested message body...");
    let resp = client
        .post_with_nested_message_body(
            &ctx,
            &PostWithNestedMessageBodyRequest {
                nm: Some(NestedMessage { a: 12, b: 45360 }),
            },
        )
        .await?;
    ensure!(resp.v == 45372, "expected 45372, got {}", resp.v);
    println!("  PASS: V = {}", resp.v);

    println!("Test 4: context to context via header...");
    let authed = CallContext::new().with_value(AUTH_HEADER, "SECRET");
    let resp = client
        .ctx_to_ctx(
            &authed,
            &MetaRequest {
                key: AUTH_HEADER.into(),
            },
        )
        .await?;
    ensure!(resp.v == "SECRET", "expected SECRET, got {:?}", resp.v);
    println!("  PASS: V = {:?}", resp.v);

    println!("Test 5: error route...");
    match client.error_rpc(&ctx, &Empty {}).await {
        Ok(_) => anyhow::bail!("error route unexpectedly succeeded"),
        Err(err) => println!("  PASS: {err}"),
    }

    println!();
    println!("All tests passed.");
    Ok(())
}
