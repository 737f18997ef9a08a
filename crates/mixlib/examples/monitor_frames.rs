//! Monitor raw console traffic.
//!
//! Demonstrates opening a TCP connection to a console and printing every
//! decoded frame as it arrives. This is useful for exploring a console's
//! protocol, verifying connectivity, or debugging a vendor backend.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p mixlib --example monitor_frames -- 192.168.1.50:50000
//! ```

use std::sync::Arc;
use std::time::Duration;

use mixlib::client::{ConnectionOptions, TcpConnection};
use mixlib::BinaryFrameCodec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=trace shows the byte-level I/O.
    tracing_subscriber::fmt::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.1.50:50000".to_string());

    println!("Connecting to console at {}...", addr);

    let conn = TcpConnection::open(
        &addr,
        Arc::new(BinaryFrameCodec::default()),
        ConnectionOptions::default(),
    )
    .await?;

    println!("Connected. Monitoring for 60 seconds...");
    println!("(Move a fader or mute a channel to generate traffic)\n");

    println!("{:<12} Frame", "Timestamp");
    println!("{:-<12} {:-<50}", "", "");

    let mut frames = conn.subscribe_frames();
    let start = tokio::time::Instant::now();
    let deadline = start + Duration::from_secs(60);

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match tokio::time::timeout(remaining, frames.recv()).await {
            Ok(Ok(frame)) => {
                let elapsed = start.elapsed();
                println!(
                    "{:>6}.{:03}s  {}",
                    elapsed.as_secs(),
                    elapsed.subsec_millis(),
                    frame
                );
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(n))) => {
                println!("(missed {} frames due to lag)", n);
            }
            Ok(Err(tokio::sync::broadcast::error::RecvError::Closed)) => {
                println!("Connection closed.");
                break;
            }
            Err(_) => {
                // Timeout -- monitoring period elapsed.
                break;
            }
        }
    }

    conn.close().await?;
    println!("\nMonitoring complete.");
    Ok(())
}
