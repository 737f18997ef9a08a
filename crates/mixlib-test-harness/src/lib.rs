//! mixlib-test-harness: scripted mock consoles for testing mixlib
//! backends.
//!
//! This crate provides [`MockConsoleServer`], a TCP listener pre-loaded
//! with a request/response script (plus unsolicited pushes) so client
//! connections and vendor backends can be tested deterministically
//! without a console on the network.

pub mod mock_console;

pub use mock_console::MockConsoleServer;
