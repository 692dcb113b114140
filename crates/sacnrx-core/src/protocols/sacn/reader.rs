use std::ops::Range;

use super::error::{Layer, RejectReason};
use super::layout;
use crate::protocols::common::reader::pdu_length;

pub struct SacnReader<'a> {
    payload: &'a [u8],
}

impl<'a> SacnReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn require_len(&self, needed: usize) -> Result<(), RejectReason> {
        if self.payload.len() < needed {
            return Err(RejectReason::TooShort {
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, RejectReason> {
        self.payload
            .get(offset)
            .copied()
            .ok_or(RejectReason::TooShort {
                needed: offset + 1,
                actual: self.payload.len(),
            })
    }

    pub fn read_u16_be(&self, range: Range<usize>) -> Result<u16, RejectReason> {
        let bytes = self.read_slice(range)?;
        match bytes {
            [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(RejectReason::TooShort {
                needed: 2,
                actual: bytes.len(),
            }),
        }
    }

    pub fn read_u32_be(&self, range: Range<usize>) -> Result<u32, RejectReason> {
        let bytes = self.read_slice(range)?;
        match bytes {
            [a, b, c, d] => Ok(u32::from_be_bytes([*a, *b, *c, *d])),
            _ => Err(RejectReason::TooShort {
                needed: 4,
                actual: bytes.len(),
            }),
        }
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], RejectReason> {
        self.payload.get(range.clone()).ok_or(RejectReason::TooShort {
            needed: range.end,
            actual: self.payload.len(),
        })
    }

    /// Check that a PDU starting at `range.start` fits inside the packet.
    pub fn require_layer_fits(&self, layer: Layer, range: Range<usize>) -> Result<(), RejectReason> {
        let start = range.start;
        let declared = pdu_length(self.read_u16_be(range)?);
        if start + declared > self.payload.len() {
            return Err(RejectReason::BadLayerLength {
                layer,
                declared,
                actual: self.payload.len() - start,
            });
        }
        Ok(())
    }

    pub fn read_optional_utf8_string(&self, range: Range<usize>) -> Result<Option<String>, RejectReason> {
        let bytes = self.read_slice(range)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        let raw = String::from_utf8_lossy(&bytes[..end]);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    pub fn read_cid(&self) -> Result<[u8; 16], RejectReason> {
        let bytes = self.read_slice(layout::CID_RANGE)?;
        let mut cid = [0u8; 16];
        cid.copy_from_slice(bytes);
        Ok(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::SacnReader;
    use crate::protocols::sacn::error::{Layer, RejectReason};

    #[test]
    fn read_u16_be_out_of_range() {
        let payload = [0u8; 3];
        let reader = SacnReader::new(&payload);
        let err = reader.read_u16_be(2..4).unwrap_err();
        assert_eq!(err, RejectReason::TooShort { needed: 4, actual: 3 });
    }

    #[test]
    fn layer_length_ignores_flag_bits() {
        let mut payload = vec![0u8; 20];
        payload[0..2].copy_from_slice(&(0x7000u16 | 20).to_be_bytes());
        let reader = SacnReader::new(&payload);
        assert!(reader.require_layer_fits(Layer::Root, 0..2).is_ok());
    }

    #[test]
    fn layer_length_past_end_is_rejected() {
        let mut payload = vec![0u8; 20];
        payload[4..6].copy_from_slice(&(0x7000u16 | 17).to_be_bytes());
        let reader = SacnReader::new(&payload);
        let err = reader.require_layer_fits(Layer::Dmp, 4..6).unwrap_err();
        assert_eq!(
            err,
            RejectReason::BadLayerLength {
                layer: Layer::Dmp,
                declared: 17,
                actual: 16,
            }
        );
    }

    #[test]
    fn utf8_string_stops_at_first_nul() {
        let mut payload = [0u8; 8];
        payload[..3].copy_from_slice(b"abc");
        payload[4] = b'z';
        let reader = SacnReader::new(&payload);
        assert_eq!(
            reader.read_optional_utf8_string(0..8).unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(reader.read_optional_utf8_string(5..8).unwrap(), None);
    }
}
