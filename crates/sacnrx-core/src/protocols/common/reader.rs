use crate::protocols::sacn::layout::PDU_LENGTH_MASK;

/// Strip the flag nibble from an ACN flags-and-length field.
pub(crate) fn pdu_length(flags_and_length: u16) -> usize {
    (flags_and_length & PDU_LENGTH_MASK) as usize
}

pub(crate) fn format_cid(cid: &[u8; 16]) -> String {
    cid.iter().map(|b| format!("{:02x}", b)).collect()
}
