//! Session pooling.
//!
//! Demonstrates:
//! - Creating a bounded pool from a factory
//! - Concurrent units of work sharing the pool
//! - Fail-fast saturation and timed waits
//! - Pool status and close
//!
//! Usage:
//!   cargo run --example 002_session_pool
//!   cargo run --example 002_session_pool -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use broker_client::{ConnectionFactory, PoolConfig, Result};
use common::{Args, BROKER_URI};

// ============================================================================
// Constants
// ============================================================================

const POOL_SIZE: usize = 4;
const WORKERS: usize = 16;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== 002: Session Pool ===\n");

    let factory = ConnectionFactory::builder().uri(BROKER_URI).build().await?;

    // ========================================================================
    // Concurrent Work
    // ========================================================================

    println!("[1] {WORKERS} workers over {POOL_SIZE} sessions...");

    let pool = factory.create_session_pool(
        PoolConfig::new()
            .with_name("demo-pool")
            .with_max_size(POOL_SIZE)
            .with_lease_timeout(Duration::from_secs(1)),
    )?;

    let work: Vec<_> = (0..WORKERS)
        .map(|_| {
            pool.with_session(|session| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                session.commit().await
            })
        })
        .collect();
    futures_util::future::try_join_all(work).await?;

    println!("    ✓ {:?}\n", pool.status());

    // ========================================================================
    // Saturation
    // ========================================================================

    println!("[2] Fail-fast saturation...");

    let strict = factory.create_session_pool(PoolConfig::new().with_max_size(1))?;
    let held = strict.lease().await?;
    match strict.lease().await {
        Err(e) if e.is_recoverable() => println!("    ✓ {e}"),
        Err(e) => return Err(e),
        Ok(_) => println!("    ✗ lease unexpectedly succeeded"),
    }
    held.release().await?;
    strict.close().await;

    // ========================================================================
    // Close
    // ========================================================================

    println!("\n[3] Closing...");

    pool.close().await;
    println!("    ✓ Pool closed, factory open: {}", !factory.is_closed());

    factory.close().await?;
    println!("    ✓ Factory closed");

    println!("\n=== Done ===");
    Ok(())
}
