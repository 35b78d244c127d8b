//! Mock chain server binary for local development of the gavel client.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use gavel_mock_chain::server::serve;
use gavel_mock_chain::MockLedger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_mock_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let addr: SocketAddr = std::env::var("GAVEL_MOCK_CHAIN_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9944".to_string())
        .parse()?;

    let ledger = Arc::new(MockLedger::new());
    // Start the clock at the current wall time so durations behave naturally.
    ledger.set_timestamp(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    );

    let (_local_addr, handle) = serve(ledger, addr).await?;

    info!("mock chain server running; press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
