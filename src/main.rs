//! Fan-out hub server
//!
//! Run with: cargo run [-- --help]
//!
//! Environment:
//!   PORT                 listening port (default 8080)
//!   HUB_BIND             bind host (default 0.0.0.0)
//!   HUB_MAX_CONNECTIONS  WebSocket connection limit, 0 = unlimited
//!   HUB_SEND_TIMEOUT_MS  per-member send timeout (default 5000)
//!   RUST_LOG             log filter
//!
//! Connect:  websocat ws://localhost:8080/ws/cases
//! Inject:   curl -XPOST localhost:8080/api/groups/cases -d '{"temperatura":38.2}'

use fanout_hub::{HubServer, ServerConfig};

fn print_usage() {
    println!("Usage: fanout-hub");
    println!();
    println!("Configured through PORT, HUB_BIND, HUB_MAX_CONNECTIONS,");
    println!("HUB_SEND_TIMEOUT_MS and RUST_LOG.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fanout_hub=info".parse()?),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = HubServer::new(config);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
