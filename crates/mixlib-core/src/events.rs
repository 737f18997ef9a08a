//! Asynchronous mixer event types.
//!
//! Events are emitted by console drivers through a [`tokio::sync::broadcast`]
//! channel when console state changes. Show-control surfaces and level
//! displays subscribe to these events for real-time updates without polling.

use crate::channel::ChannelId;
use crate::level::{FaderLevel, MeterLevel};

/// An event emitted by a console driver when mixer state changes.
///
/// Subscribe via [`crate::mixer::Mixer::subscribe()`]. Events are delivered
/// on a best-effort basis through a bounded broadcast channel; slow
/// consumers may miss events under heavy load (e.g. continuous metering).
#[derive(Debug, Clone)]
pub enum MixerEvent {
    /// A channel's display name changed or was first reported.
    ChannelName {
        /// The channel the name belongs to.
        channel: ChannelId,
        /// The console's display name for the channel.
        name: String,
    },

    /// A channel's mute state changed.
    MuteChanged {
        /// The channel whose mute changed.
        channel: ChannelId,
        /// `true` if the channel is now muted.
        muted: bool,
    },

    /// A fader moved.
    ///
    /// `input` is `None` for an output's own master fader, and `Some` for
    /// an input-to-output send level (e.g. input 3's send into aux 2).
    FaderChanged {
        /// The input side of a send, if this is a send level.
        input: Option<ChannelId>,
        /// The output whose mix the fader feeds.
        output: ChannelId,
        /// The new fader position.
        level: FaderLevel,
    },

    /// A metering sample arrived for a channel.
    MeterChanged {
        /// The channel the meter belongs to.
        channel: ChannelId,
        /// The reading in dB.
        level: MeterLevel,
    },

    /// Successfully connected to the console.
    Connected,

    /// Connection to the console was lost or shut down.
    Disconnected,
}
