use std::io;

/// A forward-only reader that pulls individual bits out of a byte stream.
///
/// Bytes are fetched from the inner reader lazily, one at a time, only when
/// the first bit of that byte is requested. The number of bytes taken from the
/// inner reader therefore always equals the number of bits consumed rounded
/// up to a whole byte.
#[derive(Debug)]
#[must_use]
pub struct BitReader<T> {
    data: T,
    bit_pos: u8,
    current_byte: u8,
    bits_read: u64,
}

impl<T> BitReader<T> {
    /// Create a new BitReader from a reader
    pub const fn new(data: T) -> Self {
        Self {
            data,
            bit_pos: 0,
            current_byte: 0,
            bits_read: 0,
        }
    }
}

impl<T: io::Read> BitReader<T> {
    /// Reads a single bit
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.is_aligned() {
            self.update_byte()?;
        }

        let bit = (self.current_byte >> (7 - self.bit_pos)) & 1;

        self.bit_pos = (self.bit_pos + 1) % 8;
        self.bits_read += 1;

        Ok(bit == 1)
    }

    fn update_byte(&mut self) -> io::Result<()> {
        let mut buf = [0];
        self.data.read_exact(&mut buf)?;
        self.current_byte = buf[0];
        Ok(())
    }

    /// Reads up to 64 bits, most significant bit first
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        let count = count.min(64);

        let mut bits = 0;
        for _ in 0..count {
            bits = (bits << 1) | self.read_bit()? as u64;
        }

        Ok(bits)
    }

    /// Discards `count` bits.
    ///
    /// Every skipped bit is still pulled from the inner reader so that running
    /// out of data is reported here instead of on a later read.
    pub fn skip_bits(&mut self, count: u32) -> io::Result<()> {
        for _ in 0..count {
            self.read_bit()?;
        }

        Ok(())
    }
}

impl<T> BitReader<T> {
    /// Returns the underlying reader
    #[inline(always)]
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Returns a reference to the underlying reader
    #[inline(always)]
    #[must_use]
    pub const fn get_ref(&self) -> &T {
        &self.data
    }

    /// Returns the current bit position within the current byte (0-7)
    #[inline(always)]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        self.bit_pos
    }

    /// Total number of bits consumed since the reader was created.
    ///
    /// This only ever grows.
    #[inline(always)]
    #[must_use]
    pub const fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Checks if the reader is aligned to the byte boundary
    #[inline(always)]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }
}

impl<B: AsRef<[u8]>> BitReader<std::io::Cursor<B>> {
    /// Creates a new BitReader from a slice
    pub const fn new_from_slice(data: B) -> Self {
        Self::new(std::io::Cursor::new(data))
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_reads_nal_header_fields() {
        let mut reader = BitReader::new_from_slice([0x65, 0x88]);

        assert!(!reader.read_bit().unwrap()); // forbidden_zero_bit
        assert_eq!(reader.read_bits(2).unwrap(), 3); // nal_ref_idc
        assert_eq!(reader.read_bits(5).unwrap(), 5); // nal_unit_type
        assert!(reader.is_aligned());
        assert_eq!(reader.read_bits(8).unwrap(), 0x88);

        assert_eq!(reader.bits_read(), 16);
        let err = reader.read_bit().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_bits_across_byte_boundary() {
        let mut reader = BitReader::new_from_slice([0b1010_1100, 0b0011_0101]);

        assert_eq!(reader.read_bits(0).unwrap(), 0);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(7).unwrap(), 0b0110000);
        assert_eq!(reader.bit_pos(), 2);
        assert_eq!(reader.read_bits(6).unwrap(), 0b110101);
        assert_eq!(reader.bits_read(), 16);

        let mut reader = BitReader::new_from_slice([0xff; 8]);
        assert_eq!(reader.read_bits(64).unwrap(), u64::MAX);
    }

    #[test]
    fn test_bytes_are_fetched_lazily() {
        let mut reader = BitReader::new_from_slice([0xff, 0x00, 0xff]);

        reader.read_bits(8).unwrap();
        assert_eq!(reader.get_ref().position(), 1);
        assert!(reader.is_aligned());

        reader.read_bit().unwrap();
        assert_eq!(reader.get_ref().position(), 2);
        assert_eq!(reader.bit_pos(), 1);
        assert_eq!(reader.bits_read(), 9);
    }

    #[test]
    fn test_skip_bits_reports_exhaustion() {
        let mut reader = BitReader::new_from_slice([0b1000_0001]);

        reader.skip_bits(7).unwrap();
        assert!(reader.read_bit().unwrap());

        let err = reader.skip_bits(1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
