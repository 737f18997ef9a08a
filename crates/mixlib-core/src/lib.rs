//! mixlib-core: Core traits, types, and error definitions for mixlib.
//!
//! This crate defines the vendor-agnostic abstractions that all mixlib
//! console backends implement. Show-control software and other applications
//! depend on these types without pulling in any specific console driver.
//!
//! # Key types
//!
//! - [`Mixer`] -- the unified trait for controlling any mixing console
//! - [`FrameCodec`] -- per-vendor wire frame parsing
//! - [`ChannelId`] / [`FaderLevel`] -- vendor-neutral channel/level model
//! - [`MixerEvent`] -- asynchronous state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod channel;
pub mod error;
pub mod events;
pub mod frame;
pub mod level;
pub mod mixer;

// Re-export key types at crate root for ergonomic `use mixlib_core::*`.
pub use channel::{ChannelId, ChannelKind, StereoLink, StereoPair};
pub use error::{Error, Result};
pub use events::MixerEvent;
pub use frame::{encode_binary_frame, BinaryFrameCodec, DecodeResult, Frame, FrameCodec, LineFrameCodec};
pub use level::{FaderLevel, FaderScale, MeterLevel, MeterScale, PiecewiseDbScale};
pub use mixer::{Mixer, MixerConfig, MixerInfo};
