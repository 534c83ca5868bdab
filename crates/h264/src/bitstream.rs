//! Syntax element reader for NAL unit payloads.

use bytes_util::BitReader;
use expgolomb::BitReaderExpGolombExt;

use crate::error::{H264Error, Result};
use crate::io::EmulationPreventionIo;

/// Reads `u(n)`, `ue(v)` and `se(v)` syntax elements from a NAL unit,
/// removing emulation prevention bytes on the fly.
///
/// Reading only moves forward. Running past the end of the unit fails with
/// [`H264Error::BufferExhausted`].
pub struct RbspReader<'a> {
    bits: BitReader<EmulationPreventionIo<&'a [u8]>>,
}

impl<'a> RbspReader<'a> {
    /// Starts reading at the first byte of `nal` (the NAL header).
    pub fn new(nal: &'a [u8]) -> Result<Self> {
        if nal.is_empty() {
            return Err(H264Error::TooShort);
        }

        Ok(Self {
            bits: BitReader::new(EmulationPreventionIo::new(nal)),
        })
    }

    /// `u(n)` for `n <= 32`.
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= 32);
        Ok(self.bits.read_bits(count.min(32))? as u32)
    }

    /// `u(1)`
    pub fn read_flag(&mut self) -> Result<bool> {
        Ok(self.bits.read_bit()?)
    }

    /// Discards `count` bits.
    pub fn skip_bits(&mut self, count: u32) -> Result<()> {
        Ok(self.bits.skip_bits(count)?)
    }

    /// `ue(v)`; values that do not fit in 32 bits are rejected.
    pub fn read_ue(&mut self) -> Result<u32> {
        let value = self.bits.read_exp_golomb()?;
        u32::try_from(value).map_err(|_| H264Error::InvalidData("ue(v) does not fit in 32 bits"))
    }

    /// `se(v)`
    pub fn read_se(&mut self) -> Result<i32> {
        let value = self.bits.read_signed_exp_golomb()?;
        i32::try_from(value).map_err(|_| H264Error::InvalidData("se(v) does not fit in 32 bits"))
    }

    /// Skips `count` consecutive `ue(v)`/`se(v)` elements. Both codes have
    /// the same length for the same bit pattern, so the sign is irrelevant.
    pub fn skip_golomb(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            self.bits.read_exp_golomb()?;
        }
        Ok(())
    }

    /// Bits of RBSP consumed so far.
    pub const fn bits_consumed(&self) -> u64 {
        self.bits.bits_read()
    }

    /// Bytes of the escaped NAL unit covering every bit consumed so far.
    ///
    /// This is the RBSP length rounded up to a whole byte plus any
    /// emulation prevention bytes that occur before that point.
    pub const fn raw_bytes_consumed(&self) -> usize {
        self.bits.get_ref().raw_bytes() as usize
    }
}
