//! Direct and scoped sessions.
//!
//! Demonstrates:
//! - Opening a factory with the builder
//! - Creating and closing a session directly
//! - Running a unit of work in a scoped session
//! - The one-call static composition
//!
//! Usage:
//!   cargo run --example 001_scoped_session
//!   cargo run --example 001_scoped_session -- --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use broker_client::{ClientConfig, ConnectionFactory, Error, Result, SessionConfig};
use common::{Args, BROKER_URI};

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
    println!("=== 001: Scoped Session ===\n");

    // ========================================================================
    // Open Factory
    // ========================================================================

    println!("[1] Opening factory...");
    println!("    URI: {BROKER_URI}");

    let factory = ConnectionFactory::builder()
        .uri(BROKER_URI)
        .call_timeout(Duration::from_secs(5))
        .build()
        .await?;

    println!("    ✓ Factory open ({})\n", factory.target().kind);

    // ========================================================================
    // Direct Session
    // ========================================================================

    println!("[2] Direct session...");

    let session = factory.create_session(SessionConfig::transacted()).await?;
    session.commit().await?;
    session.close().await?;

    println!("    ✓ {} committed and closed\n", session.id());

    // ========================================================================
    // Scoped Session
    // ========================================================================

    println!("[3] Scoped session...");

    let id = factory
        .with_session(SessionConfig::default(), |session| async move {
            session.commit().await?;
            Ok::<_, Error>(session.id())
        })
        .await?;

    println!("    ✓ {id} closed at scope end");
    println!("    Open sessions: {}\n", factory.session_count());

    factory.close().await?;

    // ========================================================================
    // Static Composition
    // ========================================================================

    println!("[4] One-call session...");

    let transacted = ConnectionFactory::run_with_session(
        ClientConfig::new(BROKER_URI).with_session(SessionConfig::transacted()),
        |session| async move { Ok::<_, Error>(session.is_transacted()) },
    )
    .await?;

    println!("    ✓ transacted = {transacted}");

    println!("\n=== Done ===");
    Ok(())
}
