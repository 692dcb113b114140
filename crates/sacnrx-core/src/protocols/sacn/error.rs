use serde::Serialize;
use thiserror::Error;

/// Why a datagram was not accepted as an E1.31 DMX data frame.
///
/// # Examples
/// ```
/// use sacnrx_core::protocols::sacn::{RejectReason, ValidationRules, validate_sacn_dmx};
///
/// let err = validate_sacn_dmx(&[0u8; 10], &ValidationRules::default()).unwrap_err();
/// assert_eq!(err, RejectReason::TooShort { needed: 126, actual: 10 });
/// assert!(err.to_string().contains("payload too short"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("payload too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("invalid preamble/postamble size: {preamble:#06x}/{postamble:#06x}")]
    BadPreamble { preamble: u16, postamble: u16 },
    #[error("invalid ACN packet identifier")]
    BadPacketIdentifier,
    #[error("{layer} layer length {declared} exceeds packet length {actual}")]
    BadLayerLength {
        layer: Layer,
        declared: usize,
        actual: usize,
    },
    #[error("invalid root vector: {value:#010x}")]
    BadRootVector { value: u32 },
    #[error("invalid framing vector: {value:#010x}")]
    BadFramingVector { value: u32 },
    #[error("invalid DMP vector: {value:#04x}")]
    BadVector { value: u8 },
    #[error("invalid start code: {value:#04x}")]
    BadStartCode { value: u8 },
    #[error("invalid property value count: {count}")]
    BadPropertyValueCount { count: u16 },
}

impl RejectReason {
    /// Stable identifier used as a diagnostic counter key.
    pub fn kind(&self) -> RejectKind {
        match self {
            RejectReason::TooShort { .. } => RejectKind::TooShort,
            RejectReason::BadPreamble { .. } => RejectKind::BadPreamble,
            RejectReason::BadPacketIdentifier => RejectKind::BadPacketIdentifier,
            RejectReason::BadLayerLength { .. } => RejectKind::BadLayerLength,
            RejectReason::BadRootVector { .. } => RejectKind::BadRootVector,
            RejectReason::BadFramingVector { .. } => RejectKind::BadFramingVector,
            RejectReason::BadVector { .. } => RejectKind::BadVector,
            RejectReason::BadStartCode { .. } => RejectKind::BadStartCode,
            RejectReason::BadPropertyValueCount { .. } => RejectKind::BadPropertyValueCount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    TooShort,
    BadPreamble,
    BadPacketIdentifier,
    BadLayerLength,
    BadRootVector,
    BadFramingVector,
    BadVector,
    BadStartCode,
    BadPropertyValueCount,
}

/// PDU layer whose declared length failed the bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Root,
    Framing,
    Dmp,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Root => "root",
            Layer::Framing => "framing",
            Layer::Dmp => "DMP",
        };
        f.write_str(name)
    }
}
