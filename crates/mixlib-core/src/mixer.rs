//! The `Mixer` trait -- unified interface for all console backends.
//!
//! This trait is the primary API surface of mixlib. Show-control software
//! and fader surfaces program against `dyn Mixer` without needing to know
//! which vendor's protocol is in use.
//!
//! Each vendor backend provides a concrete type that implements this trait
//! on top of the shared client machinery in `mixlib-client`.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::channel::{ChannelId, StereoPair};
use crate::error::Result;
use crate::events::MixerEvent;
use crate::level::FaderLevel;

/// Static information about a connected console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerInfo {
    /// Vendor name (e.g. "Mackie", "Allen & Heath").
    pub vendor: String,
    /// Model name as reported by the console.
    pub model: String,
}

/// The channel topology of a console, as detected at connect time.
#[derive(Debug, Clone, Default)]
pub struct MixerConfig {
    /// Input channels, in panel order.
    pub inputs: Vec<ChannelId>,
    /// Output buses (aux sends, groups), in panel order.
    pub outputs: Vec<ChannelId>,
    /// Stereo pairings among the channels above, including the main bus.
    pub stereo_pairs: Vec<StereoPair>,
}

/// Unified asynchronous interface for controlling a mixing console.
///
/// All methods that talk to the console are `async` because every transport
/// involves network round-trips. [`info()`](Mixer::info) returns cached
/// state and is synchronous.
///
/// # Liveness
///
/// Most console protocols are silent unless solicited, so drivers must call
/// [`send_keep_alive()`](Mixer::send_keep_alive) on an interval shorter
/// than the console's session timeout. [`check_connection()`](Mixer::check_connection)
/// is advisory: a `false` result means no traffic has been seen within the
/// driver's liveness window, and the caller decides whether to reconnect.
#[async_trait]
pub trait Mixer: Send + Sync {
    /// Return static information about the connected console.
    fn info(&self) -> &MixerInfo;

    /// Query the console for its channel topology.
    async fn detect_configuration(&self) -> Result<MixerConfig>;

    /// Set a fader level.
    ///
    /// With `input` of `None` this sets `output`'s master fader; with
    /// `Some(input)` it sets the send level from that input into `output`.
    async fn set_fader_level(
        &self,
        input: Option<ChannelId>,
        output: ChannelId,
        level: FaderLevel,
    ) -> Result<()>;

    /// Mute or unmute a channel.
    async fn set_muted(&self, channel: ChannelId, muted: bool) -> Result<()>;

    /// Send one keep-alive frame to hold the session open.
    async fn send_keep_alive(&self) -> Result<()>;

    /// Whether the connection has seen traffic within the liveness window.
    ///
    /// Advisory only; never forces a disconnect.
    fn check_connection(&self) -> bool;

    /// Obtain a broadcast receiver for mixer state change events.
    ///
    /// Multiple subscribers can exist; each gets an independent copy of
    /// every event.
    fn subscribe(&self) -> broadcast::Receiver<MixerEvent>;

    /// Disconnect from the console and release the transport.
    ///
    /// Idempotent; outstanding requests resolve with a cancellation error.
    async fn disconnect(&self) -> Result<()>;
}
