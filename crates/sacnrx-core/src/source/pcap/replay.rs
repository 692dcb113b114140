use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::source::{Datagram, DatagramSource, SourceError};

use super::capture::{CaptureReader, udp_segment};

struct Pending {
    offset: f64,
    source: std::net::SocketAddr,
    payload: Vec<u8>,
}

/// Replays the UDP payloads of a PCAP/PCAPNG capture as datagrams.
///
/// Datagrams are released against a horizon measured from the first matching
/// packet; [`advance_to`](Self::advance_to) moves the horizon. An unpaced
/// source releases everything immediately.
pub struct PcapReplaySource {
    capture: CaptureReader,
    port: Option<u16>,
    pending: Option<Pending>,
    origin: Option<f64>,
    horizon: Option<f64>,
    exhausted: bool,
    skipped_frames: u64,
}

impl PcapReplaySource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        let capture = CaptureReader::new(file)?;
        debug!(path = %path.display(), "opened capture");
        Ok(Self {
            capture,
            port: None,
            pending: None,
            origin: None,
            horizon: None,
            exhausted: false,
            skipped_frames: 0,
        })
    }

    /// Only replay datagrams sent to this UDP port.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Hold datagrams back until [`advance_to`](Self::advance_to) reaches them.
    pub fn paced(mut self) -> Self {
        self.horizon = Some(0.0);
        self
    }

    pub fn advance_to(&mut self, elapsed: Duration) {
        self.horizon = Some(elapsed.as_secs_f64());
    }

    /// Offset of the next datagram from the first one, or `None` once the
    /// capture is exhausted.
    pub fn next_offset(&mut self) -> Result<Option<Duration>, SourceError> {
        self.fill()?;
        Ok(self
            .pending
            .as_ref()
            .map(|pending| Duration::from_secs_f64(pending.offset)))
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pending.is_none()
    }

    /// Frames that were not UDP, went to another port, or failed to slice.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    fn fill(&mut self) -> Result<(), SourceError> {
        while self.pending.is_none() && !self.exhausted {
            let Some(frame) = self.capture.next_frame()? else {
                self.exhausted = true;
                debug!(skipped = self.skipped_frames, "capture exhausted");
                break;
            };
            let segment = match udp_segment(frame.linktype, &frame.data) {
                Ok(Some(segment)) => segment,
                Ok(None) => {
                    self.skipped_frames += 1;
                    continue;
                }
                Err(err) => {
                    trace!(%err, "skipping undecodable frame");
                    self.skipped_frames += 1;
                    continue;
                }
            };
            if self
                .port
                .is_some_and(|port| port != segment.destination.port())
            {
                self.skipped_frames += 1;
                continue;
            }
            let origin = *self.origin.get_or_insert(frame.ts);
            self.pending = Some(Pending {
                offset: (frame.ts - origin).max(0.0),
                source: segment.source,
                payload: segment.payload.to_vec(),
            });
        }
        Ok(())
    }
}

impl DatagramSource for PcapReplaySource {
    fn next_datagram(&mut self, buf: &mut [u8]) -> Result<Option<Datagram>, SourceError> {
        self.fill()?;
        let due = match (&self.pending, self.horizon) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(pending), Some(horizon)) => pending.offset <= horizon,
        };
        if !due {
            return Ok(None);
        }
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        let len = pending.payload.len().min(buf.len());
        buf[..len].copy_from_slice(&pending.payload[..len]);
        Ok(Some(Datagram {
            len,
            source: pending.source,
        }))
    }
}
