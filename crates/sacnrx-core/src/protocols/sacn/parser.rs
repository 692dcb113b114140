use serde::{Deserialize, Serialize};

use super::error::{Layer, RejectReason};
use super::layout;
use super::reader::SacnReader;
use crate::protocols::common::reader::format_cid;

/// Allow-lists applied on top of the fixed E1.31 checks.
///
/// Senders disagree on the start code and DMP vector they emit, so both are
/// configurable instead of hardcoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub accepted_start_codes: Vec<u8>,
    pub dmp_vectors: Vec<u8>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            accepted_start_codes: vec![layout::START_CODE_DIMMER],
            dmp_vectors: vec![layout::DMP_VECTOR_SET_PROPERTY],
        }
    }
}

/// A datagram that passed every check, borrowing its DMX slots from the
/// original buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFrame<'a> {
    pub universe: u16,
    pub start_code: u8,
    /// Declared slot count including the start code.
    pub property_value_count: u16,
    pub sequence: u8,
    pub priority: u8,
    pub options: u8,
    pub cid: [u8; 16],
    pub source_name: Option<String>,
    /// Exactly `property_value_count - 1` channel bytes.
    pub dmx: &'a [u8],
}

impl ValidatedFrame<'_> {
    /// Number of DMX channels carried, excluding the start code.
    pub fn channel_count(&self) -> usize {
        self.dmx.len()
    }

    pub fn is_preview(&self) -> bool {
        self.options & layout::OPTION_PREVIEW_DATA != 0
    }

    pub fn is_stream_terminated(&self) -> bool {
        self.options & layout::OPTION_STREAM_TERMINATED != 0
    }

    pub fn cid_hex(&self) -> String {
        format_cid(&self.cid)
    }
}

/// Validate an E1.31 DMX data packet and borrow its channel data.
///
/// Pure and total: every input yields either a frame or a [`RejectReason`].
pub fn validate_sacn_dmx<'a>(
    payload: &'a [u8],
    rules: &ValidationRules,
) -> Result<ValidatedFrame<'a>, RejectReason> {
    let reader = SacnReader::new(payload);
    reader.require_len(layout::MIN_LEN)?;

    let preamble = reader.read_u16_be(layout::PREAMBLE_SIZE_RANGE)?;
    let postamble = reader.read_u16_be(layout::POSTAMBLE_SIZE_RANGE)?;
    if preamble != layout::PREAMBLE_SIZE || postamble != layout::POSTAMBLE_SIZE {
        return Err(RejectReason::BadPreamble {
            preamble,
            postamble,
        });
    }

    let acn_pid = reader.read_slice(layout::ACN_PID_RANGE)?;
    if acn_pid != layout::ACN_PID {
        return Err(RejectReason::BadPacketIdentifier);
    }

    reader.require_layer_fits(Layer::Root, layout::ROOT_FLAGS_LENGTH_RANGE)?;
    reader.require_layer_fits(Layer::Framing, layout::FRAMING_FLAGS_LENGTH_RANGE)?;
    reader.require_layer_fits(Layer::Dmp, layout::DMP_FLAGS_LENGTH_RANGE)?;

    let root_vector = reader.read_u32_be(layout::ROOT_VECTOR_RANGE)?;
    if root_vector != layout::ROOT_VECTOR_DATA {
        return Err(RejectReason::BadRootVector { value: root_vector });
    }

    let framing_vector = reader.read_u32_be(layout::FRAMING_VECTOR_RANGE)?;
    if framing_vector != layout::FRAMING_VECTOR_DMX {
        return Err(RejectReason::BadFramingVector {
            value: framing_vector,
        });
    }

    let dmp_vector = reader.read_u8(layout::DMP_VECTOR_OFFSET)?;
    if !rules.dmp_vectors.contains(&dmp_vector) {
        return Err(RejectReason::BadVector { value: dmp_vector });
    }

    let start_code = reader.read_u8(layout::START_CODE_OFFSET)?;
    if !rules.accepted_start_codes.contains(&start_code) {
        return Err(RejectReason::BadStartCode { value: start_code });
    }

    let property_value_count = reader.read_u16_be(layout::DMP_PROPERTY_VALUE_COUNT_RANGE)?;
    let available = reader.len() - layout::DMX_DATA_OFFSET;
    let channels = usize::from(property_value_count).saturating_sub(1);
    if property_value_count == 0
        || property_value_count > layout::MAX_PROPERTY_VALUE_COUNT
        || channels > available
    {
        return Err(RejectReason::BadPropertyValueCount {
            count: property_value_count,
        });
    }
    let dmx = reader.read_slice(layout::DMX_DATA_OFFSET..layout::DMX_DATA_OFFSET + channels)?;

    Ok(ValidatedFrame {
        universe: reader.read_u16_be(layout::UNIVERSE_RANGE)?,
        start_code,
        property_value_count,
        sequence: reader.read_u8(layout::SEQUENCE_OFFSET)?,
        priority: reader.read_u8(layout::PRIORITY_OFFSET)?,
        options: reader.read_u8(layout::OPTIONS_OFFSET)?,
        cid: reader.read_cid()?,
        source_name: reader.read_optional_utf8_string(layout::SOURCE_NAME_RANGE)?,
        dmx,
    })
}
