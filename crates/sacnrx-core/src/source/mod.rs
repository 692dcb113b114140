//! Datagram sources feeding the listener.
//!
//! A source is opened when the first receiver is created and closed with the
//! last one. Live input comes from [`UdpSource`]; captures are replayed with
//! [`PcapReplaySource`]. Reads never block: `Ok(None)` means nothing is
//! pending right now.

pub mod pcap;
mod udp;

use std::net::SocketAddr;

use thiserror::Error;

pub use pcap::PcapReplaySource;
pub use udp::{UdpSource, UdpSourceConfig, universe_multicast_group};

/// Metadata of one datagram copied into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    pub len: usize,
    pub source: SocketAddr,
}

pub trait DatagramSource {
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn close(&mut self) {}

    fn join_universe(&mut self, _universe: u16) -> Result<(), SourceError> {
        Ok(())
    }

    fn leave_universe(&mut self, _universe: u16) -> Result<(), SourceError> {
        Ok(())
    }

    /// Copy the next pending datagram into `buf`, truncating if it does not
    /// fit.
    fn next_datagram(&mut self, buf: &mut [u8]) -> Result<Option<Datagram>, SourceError>;
}

impl<S: DatagramSource + ?Sized> DatagramSource for Box<S> {
    fn open(&mut self) -> Result<(), SourceError> {
        (**self).open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn join_universe(&mut self, universe: u16) -> Result<(), SourceError> {
        (**self).join_universe(universe)
    }

    fn leave_universe(&mut self, universe: u16) -> Result<(), SourceError> {
        (**self).leave_universe(universe)
    }

    fn next_datagram(&mut self, buf: &mut [u8]) -> Result<Option<Datagram>, SourceError> {
        (**self).next_datagram(buf)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("failed to join multicast group for universe {universe}: {source}")]
    Join {
        universe: u16,
        source: std::io::Error,
    },
    #[error("socket is not open")]
    NotOpen,
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<pcap::PcapSourceError> for SourceError {
    fn from(value: pcap::PcapSourceError) -> Self {
        match value {
            pcap::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
