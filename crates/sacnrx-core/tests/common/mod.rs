#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::rc::Rc;

use etherparse::PacketBuilder;
use sacnrx_core::decode::{Color, WhiteChannels};
use sacnrx_core::sink::{AddressableSink, LightSink, SinkCapabilities};
use sacnrx_core::source::{Datagram, DatagramSource, SourceError};

pub const OPTION_PREVIEW: u8 = 0x80;
pub const OPTION_TERMINATED: u8 = 0x40;

/// Build an E1.31 data packet carrying `slots` after a 0x00 start code.
pub fn sacn_packet(universe: u16, slots: &[u8]) -> Vec<u8> {
    sacn_packet_with(universe, slots, 0, 0)
}

pub fn sacn_packet_with(universe: u16, slots: &[u8], options: u8, sequence: u8) -> Vec<u8> {
    let mut data = vec![0u8; 126 + slots.len()];
    let len = data.len();
    data[0..2].copy_from_slice(&0x0010u16.to_be_bytes());
    data[4..16].copy_from_slice(b"ASC-E1.17\0\0\0");
    data[16..18].copy_from_slice(&(0x7000 | (len - 16) as u16).to_be_bytes());
    data[18..22].copy_from_slice(&4u32.to_be_bytes());
    data[22..38].copy_from_slice(&[0xab; 16]);
    data[38..40].copy_from_slice(&(0x7000 | (len - 38) as u16).to_be_bytes());
    data[40..44].copy_from_slice(&2u32.to_be_bytes());
    data[44..51].copy_from_slice(b"console");
    data[108] = 100;
    data[111] = sequence;
    data[112] = options;
    data[113..115].copy_from_slice(&universe.to_be_bytes());
    data[115..117].copy_from_slice(&(0x7000 | (len - 115) as u16).to_be_bytes());
    data[117] = 0x02;
    data[118] = 0xa1;
    data[121..123].copy_from_slice(&1u16.to_be_bytes());
    data[123..125].copy_from_slice(&((slots.len() + 1) as u16).to_be_bytes());
    data[126..].copy_from_slice(slots);
    data
}

/// In-memory datagram source driven by the test.
#[derive(Default)]
pub struct QueueSource {
    pub queue: VecDeque<(SocketAddr, Vec<u8>)>,
    pub open: bool,
}

impl QueueSource {
    pub fn push(&mut self, bytes: Vec<u8>) {
        self.push_from("192.168.1.10:50000".parse().unwrap(), bytes);
    }

    pub fn push_from(&mut self, source: SocketAddr, bytes: Vec<u8>) {
        self.queue.push_back((source, bytes));
    }
}

impl DatagramSource for QueueSource {
    fn open(&mut self) -> Result<(), SourceError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn next_datagram(&mut self, buf: &mut [u8]) -> Result<Option<Datagram>, SourceError> {
        Ok(self.queue.pop_front().map(|(source, bytes)| {
            let len = bytes.len().min(buf.len());
            buf[..len].copy_from_slice(&bytes[..len]);
            Datagram { len, source }
        }))
    }
}

/// What a [`SharedSink`] has been told, readable after the sink was boxed.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub color: Option<Color>,
    pub brightness: Option<f32>,
    pub pixels: Option<Vec<Option<Color>>>,
    pub restored: Vec<Color>,
    pub flushes: usize,
}

pub struct SharedSink {
    white: WhiteChannels,
    external: Color,
    log: Rc<RefCell<SinkLog>>,
}

impl SharedSink {
    pub fn fixture(white: WhiteChannels, external: Color) -> (Box<dyn LightSink>, Rc<RefCell<SinkLog>>) {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let sink = SharedSink {
            white,
            external,
            log: Rc::clone(&log),
        };
        (Box::new(sink), log)
    }

    pub fn strip(pixels: usize) -> (Box<dyn LightSink>, Rc<RefCell<SinkLog>>) {
        let log = Rc::new(RefCell::new(SinkLog {
            pixels: Some(vec![None; pixels]),
            ..SinkLog::default()
        }));
        let sink = SharedSink {
            white: WhiteChannels::None,
            external: Color::BLACK,
            log: Rc::clone(&log),
        };
        (Box::new(sink), log)
    }
}

impl LightSink for SharedSink {
    fn capabilities(&self) -> SinkCapabilities {
        SinkCapabilities { white: self.white }
    }

    fn set_color(&mut self, color: Color) {
        self.log.borrow_mut().color = Some(color);
    }

    fn set_brightness(&mut self, value: f32) {
        self.log.borrow_mut().brightness = Some(value);
    }

    fn flush(&mut self) {
        self.log.borrow_mut().flushes += 1;
    }

    fn external_state(&self) -> Color {
        self.external
    }

    fn restore_external_state(&mut self, color: Color) {
        self.log.borrow_mut().restored.push(color);
    }

    fn as_addressable(&mut self) -> Option<&mut dyn AddressableSink> {
        if self.log.borrow().pixels.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl AddressableSink for SharedSink {
    fn pixel_count(&self) -> usize {
        self.log.borrow().pixels.as_ref().map_or(0, Vec::len)
    }

    fn set_pixel(&mut self, index: usize, color: Color) {
        if let Some(pixels) = self.log.borrow_mut().pixels.as_mut() {
            pixels[index] = Some(color);
        }
    }
}

/// Wrap a UDP payload in Ethernet/IPv4/UDP headers.
pub fn ethernet_frame(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0, 1, 2, 3, 4, 5], [1, 0, 94, 127, 0, 1])
        .ipv4([192, 168, 1, 10], [239, 255, 0, 1], 16)
        .udp(50000, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// Write a legacy little-endian PCAP with Ethernet linktype.
///
/// Each record is `(seconds, microseconds, frame)`.
pub fn write_pcap(path: &Path, records: &[(u32, u32, Vec<u8>)]) {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    for (sec, usec, frame) in records {
        out.extend_from_slice(&sec.to_le_bytes());
        out.extend_from_slice(&usec.to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    std::fs::write(path, out).unwrap();
}
