//! sACN (E1.31) data packet validation.
//!
//! The parser checks the fixed root/framing/DMP headers, bounds-checks every
//! declared PDU length against the datagram, applies the configurable
//! start-code and DMP-vector allow-lists, and hands back a frame that borrows
//! its DMX slots from the receive buffer.
//!
//! Wire-format details are defined in `layout`; safe reads and ACN
//! conventions live in `reader`.
pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::{Layer, RejectKind, RejectReason};
pub use parser::{ValidatedFrame, ValidationRules, validate_sacn_dmx};
