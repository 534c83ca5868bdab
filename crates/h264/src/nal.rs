//! Splits an access unit into NAL units.

use memchr::memmem;

use crate::NALUnitType;
use crate::error::{H264Error, Result};

const START_CODE: &[u8] = &[0x00, 0x00, 0x01];

/// Which unit zero bytes directly in front of an Annex-B start code belong to.
///
/// A 4 byte start code, or `trailing_zero_8bits` padding, shows up as extra
/// zero bytes in front of the 3 byte `00 00 01` pattern. Both interpretations
/// exist in the wild, so callers have to pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroPadding {
    /// The zeros stay in the payload of the unit before the start code and are
    /// counted in its length.
    PrecedingUnit,
    /// The zeros are part of the start code of the following unit and are not
    /// included in any payload.
    NextUnit,
}

/// How NAL units are delimited inside an access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalFormat {
    /// Start code delimited (ISO/IEC 14496-10 Annex B).
    AnnexB(ZeroPadding),
    /// Each unit is preceded by a big-endian length field of `length_size`
    /// bytes (1 to 4), as in MP4 samples.
    LengthPrefixed {
        /// Width of the length field in bytes
        length_size: u8,
    },
}

/// One NAL unit inside an access unit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    /// Offset of the first payload byte (the NAL header) in the buffer.
    pub offset: usize,
    /// Number of framing bytes in front of the payload: the length field, or
    /// the start code together with whatever the [`ZeroPadding`] policy
    /// assigned to it.
    pub prefix_length: usize,
    /// The unit itself, starting with its NAL header byte.
    pub payload: &'a [u8],
    /// `nal_unit_type`
    pub nal_type: NALUnitType,
}

impl NalUnit<'_> {
    /// Payload length in bytes.
    pub const fn len(&self) -> usize {
        self.payload.len()
    }

    /// Never true for units produced by [`NalScanner`].
    pub const fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether this unit carries slice data.
    pub const fn is_vcl(&self) -> bool {
        self.nal_type.is_vcl()
    }
}

/// Iterator over the NAL units of one access unit.
///
/// Empty Annex-B units (two start codes back to back) are skipped. After an
/// error the iterator is exhausted.
pub struct NalScanner<'a> {
    data: &'a [u8],
    format: NalFormat,
    /// Position of the next unit's payload (Annex-B) or length field.
    pos: usize,
    /// Prefix length of the unit starting at `pos` (Annex-B only).
    prefix_length: usize,
}

impl<'a> NalScanner<'a> {
    /// Starts scanning `data`. In Annex-B mode anything before the first start
    /// code is ignored.
    pub fn new(data: &'a [u8], format: NalFormat) -> Self {
        let mut scanner = Self {
            data,
            format,
            pos: 0,
            prefix_length: 0,
        };

        if let NalFormat::AnnexB(_) = format {
            match memmem::find(data, START_CODE) {
                Some(index) => {
                    scanner.pos = index + START_CODE.len();
                    scanner.prefix_length = scanner.pos;
                }
                None => scanner.pos = data.len(),
            }
        }

        scanner
    }

    fn next_annexb(&mut self, padding: ZeroPadding) -> Option<NalUnit<'a>> {
        while self.pos < self.data.len() {
            let start = self.pos;
            let prefix_length = self.prefix_length;

            let (end, next_pos) = match memmem::find(&self.data[start..], START_CODE) {
                Some(found) => {
                    let code = start + found;
                    let end = match padding {
                        ZeroPadding::PrecedingUnit => code,
                        ZeroPadding::NextUnit => {
                            let zeros = self.data[start..code]
                                .iter()
                                .rev()
                                .take_while(|byte| **byte == 0)
                                .count();
                            code - zeros
                        }
                    };
                    (end, code + START_CODE.len())
                }
                None => (self.data.len(), self.data.len()),
            };

            self.pos = next_pos;
            self.prefix_length = next_pos - end;

            if end > start {
                let payload = &self.data[start..end];
                return Some(NalUnit {
                    offset: start,
                    prefix_length,
                    payload,
                    nal_type: NALUnitType::from_header(payload[0]),
                });
            }

            // An empty unit hands its framing over to the next one.
            self.prefix_length += prefix_length;
        }

        None
    }

    fn next_length_prefixed(&mut self, length_size: u8) -> Result<NalUnit<'a>> {
        if !(1..=4).contains(&length_size) {
            return Err(H264Error::InvalidData("NAL length size must be 1 to 4 bytes"));
        }

        let field = length_size as usize;
        let available = self.data.len() - self.pos;
        if available < field {
            return Err(H264Error::Truncated {
                needed: field,
                available,
            });
        }

        let length = self.data[self.pos..self.pos + field]
            .iter()
            .fold(0usize, |acc, byte| (acc << 8) | *byte as usize);
        let start = self.pos + field;
        let available = self.data.len() - start;

        if length == 0 {
            return Err(H264Error::InvalidData("zero length NAL unit"));
        }
        if length > available {
            return Err(H264Error::Truncated {
                needed: length,
                available,
            });
        }

        self.pos = start + length;
        let payload = &self.data[start..start + length];
        Ok(NalUnit {
            offset: start,
            prefix_length: field,
            payload,
            nal_type: NALUnitType::from_header(payload[0]),
        })
    }
}

impl<'a> Iterator for NalScanner<'a> {
    type Item = Result<NalUnit<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.format {
            NalFormat::AnnexB(padding) => self.next_annexb(padding).map(Ok),
            NalFormat::LengthPrefixed { length_size } => {
                if self.pos >= self.data.len() {
                    return None;
                }

                let unit = self.next_length_prefixed(length_size);
                if unit.is_err() {
                    self.pos = self.data.len();
                }
                Some(unit)
            }
        }
    }
}

/// Whether `data` begins with an Annex-B start code, possibly after extra zero bytes.
pub fn starts_with_start_code(data: &[u8]) -> bool {
    let zeros = data.iter().take_while(|byte| **byte == 0).count();
    zeros >= 2 && data.get(zeros) == Some(&0x01)
}
