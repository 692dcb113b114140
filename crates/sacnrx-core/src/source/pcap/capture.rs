use std::fs::File;
use std::net::{IpAddr, SocketAddr};

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapNGReader, traits::PcapReaderIterator,
};

use super::error::{FrameError, PcapSourceError};
use super::layout;
use super::reader::{
    is_pcapng_magic, legacy_ts_to_seconds, linktype_for_interface, pcapng_ts_to_seconds,
    read_magic_and_rewind, udp_payload,
};

/// One link-layer frame as stored in the capture.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Capture time in seconds since the epoch.
    pub ts: f64,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

/// UDP payload lifted out of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpSegment<'a> {
    pub source: SocketAddr,
    pub destination: SocketAddr,
    pub payload: &'a [u8],
}

pub enum CaptureReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl CaptureReader {
    /// Sniff the magic and pick the legacy or PCAPNG reader.
    pub fn new(mut file: File) -> Result<Self, PcapSourceError> {
        let magic = read_magic_and_rewind(&mut file)?;
        if is_pcapng_magic(&magic) {
            let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
                PcapSourceError::Pcap {
                    context: "pcapng reader init",
                    message: e.to_string(),
                }
            })?;
            Ok(CaptureReader::Ng {
                reader,
                linktypes: Vec::new(),
            })
        } else {
            let reader =
                LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
                    PcapSourceError::Pcap {
                        context: "pcap reader init",
                        message: e.to_string(),
                    }
                })?;
            Ok(CaptureReader::Legacy {
                reader,
                linktype: None,
            })
        }
    }

    /// Next packet block, skipping headers and interface descriptions.
    pub fn next_frame(&mut self) -> Result<Option<CaptureFrame>, PcapSourceError> {
        loop {
            match self {
                CaptureReader::Legacy { reader, linktype } => match reader.next() {
                    Ok((offset, block)) => {
                        let frame = match block {
                            PcapBlockOwned::LegacyHeader(header) => {
                                *linktype = Some(header.network);
                                None
                            }
                            PcapBlockOwned::Legacy(packet) => Some(CaptureFrame {
                                ts: legacy_ts_to_seconds(packet.ts_sec, packet.ts_usec),
                                linktype: linktype.unwrap_or(Linktype::ETHERNET),
                                data: packet.data.to_vec(),
                            }),
                            _ => None,
                        };
                        reader.consume(offset);
                        if frame.is_some() {
                            return Ok(frame);
                        }
                    }
                    Err(pcap_parser::PcapError::Eof) => return Ok(None),
                    Err(pcap_parser::PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| PcapSourceError::Pcap {
                            context: "pcap reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(PcapSourceError::Pcap {
                            context: "pcap reader next",
                            message: e.to_string(),
                        });
                    }
                },
                CaptureReader::Ng { reader, linktypes } => match reader.next() {
                    Ok((offset, block)) => {
                        let frame = match block {
                            PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                                linktypes.push(intf.linktype);
                                None
                            }
                            PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                                Some(CaptureFrame {
                                    ts: pcapng_ts_to_seconds(packet.ts_high, packet.ts_low),
                                    linktype: linktype_for_interface(linktypes, packet.if_id),
                                    data: packet.data.to_vec(),
                                })
                            }
                            _ => None,
                        };
                        reader.consume(offset);
                        if frame.is_some() {
                            return Ok(frame);
                        }
                    }
                    Err(pcap_parser::PcapError::Eof) => return Ok(None),
                    Err(pcap_parser::PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| PcapSourceError::Pcap {
                            context: "pcapng reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(PcapSourceError::Pcap {
                            context: "pcapng reader next",
                            message: e.to_string(),
                        });
                    }
                },
            }
        }
    }
}

/// Reduce a link-layer frame to its UDP payload.
///
/// Returns `Ok(None)` for non-UDP traffic and unsupported linktypes.
pub fn udp_segment(linktype: Linktype, data: &[u8]) -> Result<Option<UdpSegment<'_>>, FrameError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| FrameError::Slice(e.to_string()))?
        }
        Linktype::RAW => SlicedPacket::from_ip(data).map_err(|e| FrameError::Slice(e.to_string()))?,
        _ => return Ok(None),
    };

    let net = sliced.net.ok_or(FrameError::MissingNetworkLayer)?;
    let Some(TransportSlice::Udp(udp)) = sliced.transport else {
        return Ok(None);
    };

    let (src_ip, dst_ip) = match net {
        NetSlice::Ipv4(ref ipv4) => (
            IpAddr::V4(ipv4.header().source_addr()),
            IpAddr::V4(ipv4.header().destination_addr()),
        ),
        NetSlice::Ipv6(ref ipv6) => (
            IpAddr::V6(ipv6.header().source_addr()),
            IpAddr::V6(ipv6.header().destination_addr()),
        ),
        #[allow(unreachable_patterns)]
        _ => return Ok(None),
    };

    let ip_payload = net.ip_payload_ref().ok_or(FrameError::MissingIpPayload)?;
    let payload = udp_payload(ip_payload.payload)?;

    Ok(Some(UdpSegment {
        source: SocketAddr::new(src_ip, udp.source_port()),
        destination: SocketAddr::new(dst_ip, udp.destination_port()),
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    #[test]
    fn udp_over_ethernet() {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([192, 168, 0, 1], [239, 255, 0, 1], 64)
            .udp(54321, 5568);
        let payload = [1, 2, 3, 4];
        let mut packet = Vec::<u8>::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();

        let segment = udp_segment(Linktype::ETHERNET, &packet).unwrap().unwrap();
        assert_eq!(segment.source, "192.168.0.1:54321".parse().unwrap());
        assert_eq!(segment.destination.port(), 5568);
        assert_eq!(segment.payload, payload);
    }

    #[test]
    fn tcp_is_not_a_segment() {
        let builder = PacketBuilder::ethernet2([1, 1, 1, 1, 1, 1], [2, 2, 2, 2, 2, 2])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(1000, 5568, 0, 0);
        let mut packet = Vec::<u8>::with_capacity(builder.size(4));
        builder.write(&mut packet, &[0u8; 4]).unwrap();

        assert!(udp_segment(Linktype::ETHERNET, &packet).unwrap().is_none());
    }

    #[test]
    fn empty_frame_is_a_slice_error() {
        assert!(matches!(
            udp_segment(Linktype::ETHERNET, &[]),
            Err(FrameError::Slice(_))
        ));
    }

    #[test]
    fn unsupported_linktype_is_skipped() {
        assert!(udp_segment(Linktype::NULL, &[0u8; 64]).unwrap().is_none());
    }
}
