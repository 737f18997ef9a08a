//! Vendor-neutral channel addressing.
//!
//! Every console backend translates its own raw addressing (Mackie channel
//! strips, Qu NRPN numbers, UCNet object paths, ...) into [`ChannelId`]
//! values. Applications never see raw vendor addresses.

use std::fmt;

use crate::error::{Error, Result};

/// Whether a channel is an input (channel strip) or an output (bus/aux/main).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelKind {
    /// An input channel strip.
    Input,
    /// An output bus, aux send, or the main mix.
    Output,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Input => write!(f, "In"),
            ChannelKind::Output => write!(f, "Out"),
        }
    }
}

/// Vendor-neutral identifier for one mixer channel.
///
/// Indices are 1-based, matching how every supported console labels its
/// channel strips on the front panel. The stereo main bus is addressed via
/// the distinguished [`MAIN_LEFT`](ChannelId::MAIN_LEFT) and
/// [`MAIN_RIGHT`](ChannelId::MAIN_RIGHT) sentinels, which sort after all
/// normal output channels.
///
/// Equality and ordering are by `(kind, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId {
    kind: ChannelKind,
    index: u16,
}

impl ChannelId {
    /// Left side of the stereo main bus.
    pub const MAIN_LEFT: ChannelId = ChannelId {
        kind: ChannelKind::Output,
        index: u16::MAX - 1,
    };

    /// Right side of the stereo main bus.
    pub const MAIN_RIGHT: ChannelId = ChannelId {
        kind: ChannelKind::Output,
        index: u16::MAX,
    };

    /// Create an input channel id. Indices are 1-based; 0 is rejected.
    pub fn input(index: u16) -> Result<Self> {
        Self::new(ChannelKind::Input, index)
    }

    /// Create an output channel id. Indices are 1-based; 0 is rejected.
    pub fn output(index: u16) -> Result<Self> {
        Self::new(ChannelKind::Output, index)
    }

    /// Create a channel id of the given kind.
    ///
    /// Returns [`Error::InvalidParameter`] for index 0 or an index that
    /// collides with the main-bus sentinel range.
    pub fn new(kind: ChannelKind, index: u16) -> Result<Self> {
        if index == 0 {
            return Err(Error::InvalidParameter(
                "channel index must be >= 1".into(),
            ));
        }
        if kind == ChannelKind::Output && index >= Self::MAIN_LEFT.index {
            return Err(Error::InvalidParameter(format!(
                "output index {index} is reserved for the main bus"
            )));
        }
        Ok(ChannelId { kind, index })
    }

    /// The channel kind (input or output).
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// The 1-based channel index.
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Whether this id is one of the main-bus sentinels.
    pub fn is_main(&self) -> bool {
        *self == Self::MAIN_LEFT || *self == Self::MAIN_RIGHT
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MAIN_LEFT {
            write!(f, "Main-L")
        } else if *self == Self::MAIN_RIGHT {
            write!(f, "Main-R")
        } else {
            write!(f, "{}-{}", self.kind, self.index)
        }
    }
}

/// How the two sides of a stereo pair are controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StereoLink {
    /// Fader level and mute always apply to both sides together.
    Linked,
    /// Each side has its own independently controllable fader and mute.
    FullyIndependent,
}

/// Two channels treated as a stereo pair.
///
/// Both sides must be the same [`ChannelKind`]; a pair mixing an input with
/// an output is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StereoPair {
    left: ChannelId,
    right: ChannelId,
    link: StereoLink,
}

impl StereoPair {
    /// Create a stereo pair from two channels of the same kind.
    pub fn new(left: ChannelId, right: ChannelId, link: StereoLink) -> Result<Self> {
        if left.kind() != right.kind() {
            return Err(Error::InvalidParameter(format!(
                "stereo pair must be same kind: {left} / {right}"
            )));
        }
        Ok(StereoPair { left, right, link })
    }

    /// The stereo main bus pair (always linked on every supported console).
    pub fn main() -> Self {
        StereoPair {
            left: ChannelId::MAIN_LEFT,
            right: ChannelId::MAIN_RIGHT,
            link: StereoLink::Linked,
        }
    }

    /// Left side of the pair.
    pub fn left(&self) -> ChannelId {
        self.left
    }

    /// Right side of the pair.
    pub fn right(&self) -> ChannelId {
        self.right
    }

    /// How the two sides are linked.
    pub fn link(&self) -> StereoLink {
        self.link
    }
}

impl fmt::Display for StereoPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.left, self.right)
    }
}
