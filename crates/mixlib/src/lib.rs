//! # mixlib -- Asynchronous Control of Digital Mixing Consoles
//!
//! `mixlib` is an asynchronous Rust library for controlling digital audio
//! mixing consoles over the network. It is designed for broadcast
//! automation, remote production, and accessibility tooling where
//! low-latency, reliable fader and mute control is essential.
//!
//! ## Quick Start
//!
//! Add `mixlib` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mixlib = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Open a connection and watch the console's traffic:
//!
//! ```no_run
//! use std::sync::Arc;
//! use mixlib::client::{ConnectionOptions, TcpConnection};
//! use mixlib::BinaryFrameCodec;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let conn = TcpConnection::open(
//!         "192.168.1.50:50000",
//!         Arc::new(BinaryFrameCodec::default()),
//!         ConnectionOptions::default(),
//!     )
//!     .await?;
//!
//!     let mut frames = conn.subscribe_frames();
//!     while let Ok(frame) = frames.recv().await {
//!         println!("{}", frame);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                          |
//! |-----------------------|--------------------------------------------------|
//! | `mixlib-core`         | Traits ([`Mixer`], [`FrameCodec`]), types, errors |
//! | `mixlib-client`       | TCP/UDP connections, framing, correlation        |
//! | `mixlib-test-harness` | Scripted mock consoles for backend tests         |
//! | **`mixlib`**          | This facade crate -- re-exports everything       |
//!
//! Vendor backends implement the [`Mixer`] trait over the machinery in
//! [`client`], so application code can work with `dyn Mixer` and remain
//! vendor-agnostic.
//!
//! ## The `Mixer` Trait
//!
//! The [`Mixer`] trait is the central abstraction. It provides async
//! methods for the operations every supported console shares:
//!
//! - **Levels**: [`set_fader_level`](Mixer::set_fader_level) for both
//!   output faders and input-to-output sends
//! - **Mutes**: [`set_muted`](Mixer::set_muted)
//! - **Topology**: [`detect_configuration`](Mixer::detect_configuration)
//! - **Session**: [`send_keep_alive`](Mixer::send_keep_alive),
//!   [`check_connection`](Mixer::check_connection)
//! - **Events**: [`subscribe`](Mixer::subscribe) for real-time surface
//!   change notifications
//!
//! ## Event Subscription
//!
//! Backends emit [`MixerEvent`]s through a broadcast channel. Subscribe to
//! receive fader moves, mute changes, channel renames, and meter readings
//! without polling:
//!
//! ```no_run
//! use mixlib::{Mixer, MixerEvent};
//! # async fn example(mixer: &dyn Mixer) -> mixlib::Result<()> {
//! let mut events = mixer.subscribe();
//! loop {
//!     match events.recv().await {
//!         Ok(MixerEvent::FaderChanged { input, output, level }) => {
//!             println!("{:?} -> {}: {:?}", input, output, level);
//!         }
//!         Ok(event) => println!("{:?}", event),
//!         Err(_) => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub use mixlib_core::*;

/// Protocol-client machinery shared by vendor backends.
///
/// Provides [`TcpConnection`](client::TcpConnection),
/// [`UdpConnection`](client::UdpConnection), the
/// [`StreamFrameBuffer`](client::StreamFrameBuffer), and the
/// [`RequestCorrelator`](client::RequestCorrelator) a backend composes
/// under its protocol logic.
pub mod client {
    pub use mixlib_client::*;
}
