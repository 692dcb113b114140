//! Drive a listener from a capture file.
//!
//! Time is virtual by default: each datagram is processed at
//! `start + capture offset`, so receiver timeouts fire exactly as they would
//! have live, without waiting. `realtime` additionally sleeps between
//! datagrams.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::config::{ListenerConfig, OutputConfig};
use crate::listener::{Listener, ListenerError};
use crate::report::{InputInfo, Report};
use crate::sink::{LightSink, MemorySink};
use crate::source::{PcapReplaySource, SourceError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    pub realtime: bool,
    /// Extra virtual time after the last datagram, so pending timeouts can
    /// fire.
    pub tail: Duration,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no receivers configured")]
    NoReceivers,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// In-memory sink matching an output description.
pub fn memory_sink_for(output: &OutputConfig) -> Box<dyn LightSink> {
    if output.addressable || output.receiver.pixel_count > 1 {
        Box::new(MemorySink::strip(output.receiver.pixel_count, output.white))
    } else {
        Box::new(MemorySink::fixture(output.white))
    }
}

/// Replay `path` through a listener built from `config` and report the
/// final state.
///
/// # Errors
/// Fails when the capture cannot be read or a receiver is rejected.
pub fn replay_pcap_file(
    path: &Path,
    config: &ListenerConfig,
    options: ReplayOptions,
) -> Result<Report, ReplayError> {
    if config.receivers.is_empty() {
        return Err(ReplayError::NoReceivers);
    }
    let bytes = fs::metadata(path).map_err(SourceError::from)?.len();
    let source = PcapReplaySource::open(path)?
        .with_port(Some(config.port))
        .paced();
    let mut listener = Listener::new(source, config.listener_options());
    for output in &config.receivers {
        listener.create_receiver(output.receiver.clone(), memory_sink_for(output))?;
    }

    let start = Instant::now();
    let mut last = Duration::ZERO;
    while let Some(offset) = listener.source_mut().next_offset()? {
        if options.realtime {
            std::thread::sleep((start + offset).saturating_duration_since(Instant::now()));
        }
        listener.source_mut().advance_to(offset);
        listener.tick_at(start + offset)?;
        last = offset;
    }
    listener.tick_at(start + last + options.tail)?;

    let stats = listener.stats().clone();
    info!(
        datagrams = stats.datagrams,
        accepted = stats.accepted,
        rejected = stats.rejected,
        "replay finished"
    );
    let input = InputInfo {
        path: path.display().to_string(),
        bytes,
        skipped_frames: listener.source().skipped_frames(),
    };
    Ok(Report::new(Some(input), stats, listener.snapshots()))
}
