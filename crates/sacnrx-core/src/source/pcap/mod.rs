//! Capture replay.
//!
//! Reads PCAP or PCAPNG files, slices each frame down to its UDP payload and
//! hands the payloads to the listener as if they had arrived on a socket.

pub mod capture;
pub mod error;
pub mod layout;
pub mod reader;
mod replay;

pub use error::{FrameError, PcapSourceError};
pub use replay::PcapReplaySource;
