use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use tracing::{debug, info, warn};

use crate::protocols::sacn::layout;

use super::{Datagram, DatagramSource, SourceError};

/// sACN multicast group for a universe: `239.255.<hi>.<lo>`.
pub fn universe_multicast_group(universe: u16) -> Ipv4Addr {
    let [hi, lo] = universe.to_be_bytes();
    Ipv4Addr::new(239, 255, hi, lo)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSourceConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    pub multicast_interface: Ipv4Addr,
}

impl Default for UdpSourceConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: layout::DEFAULT_PORT,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// Non-blocking UDP socket on the sACN port.
#[derive(Debug)]
pub struct UdpSource {
    config: UdpSourceConfig,
    socket: Option<UdpSocket>,
    joined: BTreeSet<u16>,
}

impl UdpSource {
    pub fn new(config: UdpSourceConfig) -> Self {
        Self {
            config,
            socket: None,
            joined: BTreeSet::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

impl DatagramSource for UdpSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let addr = SocketAddr::new(self.config.bind_address, self.config.port);
        let socket = UdpSocket::bind(addr).map_err(|source| SourceError::Bind { addr, source })?;
        socket.set_nonblocking(true)?;
        info!(%addr, "listening for sACN");
        self.socket = Some(socket);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            self.joined.clear();
            info!("sACN socket closed");
        }
    }

    fn join_universe(&mut self, universe: u16) -> Result<(), SourceError> {
        let socket = self.socket.as_ref().ok_or(SourceError::NotOpen)?;
        if self.joined.contains(&universe) {
            return Ok(());
        }
        let group = universe_multicast_group(universe);
        socket
            .join_multicast_v4(&group, &self.config.multicast_interface)
            .map_err(|source| SourceError::Join { universe, source })?;
        debug!(universe, %group, "joined multicast group");
        self.joined.insert(universe);
        Ok(())
    }

    fn leave_universe(&mut self, universe: u16) -> Result<(), SourceError> {
        let socket = self.socket.as_ref().ok_or(SourceError::NotOpen)?;
        if !self.joined.remove(&universe) {
            return Ok(());
        }
        let group = universe_multicast_group(universe);
        if let Err(err) = socket.leave_multicast_v4(&group, &self.config.multicast_interface) {
            warn!(universe, %group, %err, "failed to leave multicast group");
            return Err(err.into());
        }
        debug!(universe, %group, "left multicast group");
        Ok(())
    }

    fn next_datagram(&mut self, buf: &mut [u8]) -> Result<Option<Datagram>, SourceError> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(None);
        };
        match socket.recv_from(buf) {
            Ok((len, source)) => Ok(Some(Datagram { len, source })),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            // ICMP port-unreachable surfaces as a reset on some platforms.
            Err(err) if err.kind() == ErrorKind::ConnectionReset => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
