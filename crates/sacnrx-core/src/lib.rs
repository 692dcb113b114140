//! sACN (E1.31) receiver core.
//!
//! Datagrams flow from a [`source`] into the [`listener`], which validates
//! them with the [`protocols::sacn`] parser and hands valid frames to the
//! [`router`]. The router dispatches each frame by universe to the
//! [`receiver`]s registered there; a receiver decodes its channel range with
//! [`decode`] and writes the result to a [`sink`]. Parsing is byte-oriented
//! and side-effect free; all I/O lives in `source`.
//!
//! Invariants:
//! - A datagram either yields a fully validated frame or a single reject reason.
//! - Per universe, receivers are served in registration order.
//! - A receiver's timeout fallback runs at most once per silence.
//!
//! # Examples
//! ```
//! use std::time::Instant;
//!
//! use sacnrx_core::config::ListenerConfig;
//! use sacnrx_core::listener::Listener;
//! use sacnrx_core::receiver::ReceiverConfig;
//! use sacnrx_core::sink::MemorySink;
//! use sacnrx_core::source::PcapReplaySource;
//! # fn run(source: PcapReplaySource) -> Result<(), Box<dyn std::error::Error>> {
//!
//! let config = ListenerConfig::default();
//! let mut listener = Listener::new(source, config.listener_options());
//! let handle = listener.create_receiver(
//!     ReceiverConfig { universe: 1, ..ReceiverConfig::default() },
//!     Box::new(MemorySink::fixture(Default::default())),
//! )?;
//! listener.tick_at(Instant::now())?;
//! println!("{:?}", listener.receiver(handle).map(|r| r.state()));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decode;
pub mod listener;
pub mod protocols;
pub mod receiver;
pub mod replay;
mod report;
pub mod router;
pub mod sink;
pub mod source;

pub use config::{ConfigFileError, ListenerConfig, OutputConfig};
pub use listener::{Listener, ListenerError, ListenerOptions, ListenerStats, TickSummary};
pub use receiver::{
    ConfigError, FallbackPolicy, Receiver, ReceiverConfig, ReceiverState, TransportMode,
};
pub use replay::{ReplayError, ReplayOptions, replay_pcap_file};
pub use report::{DEFAULT_GENERATED_AT, InputInfo, REPORT_VERSION, Report, ToolInfo};
pub use router::{ReceiverHandle, RouterOptions, UniverseRouter};
pub use sink::{AddressableSink, LightSink, MemorySink, SinkCapabilities};
pub use source::{Datagram, DatagramSource, PcapReplaySource, SourceError, UdpSource};
