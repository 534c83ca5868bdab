use std::io;

/// A writer that packs individual bits into a byte stream, most significant
/// bit first.
///
/// Used to build bitstream fixtures; a partially filled byte is only emitted
/// on [`BitWriter::align`] or [`BitWriter::finish`].
#[derive(Debug)]
#[must_use]
pub struct BitWriter<W> {
    bit_pos: u8,
    current_byte: u8,
    writer: W,
}

impl<W: Default> Default for BitWriter<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}

impl<W: io::Write> BitWriter<W> {
    /// Writes a single bit to the stream
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.current_byte |= 1 << (7 - self.bit_pos);
        }

        self.bit_pos += 1;

        if self.bit_pos == 8 {
            self.writer.write_all(&[self.current_byte])?;
            self.current_byte = 0;
            self.bit_pos = 0;
        }

        Ok(())
    }

    /// Writes the low `count` bits of `bits`, most significant bit first.
    ///
    /// Fails with [`io::ErrorKind::InvalidData`] when `bits` does not fit in
    /// `count` bits.
    pub fn write_bits(&mut self, bits: u64, count: u8) -> io::Result<()> {
        let count = count.min(64);

        if count != 64 && bits > (1 << count as u64) - 1 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bits too large to write"));
        }

        for shift in (0..count).rev() {
            self.write_bit((bits >> shift) & 1 == 1)?;
        }

        Ok(())
    }

    /// Writes whole bytes, regardless of the current alignment.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.is_aligned() {
            return self.writer.write_all(bytes);
        }

        bytes.iter().try_for_each(|byte| self.write_bits(*byte as u64, 8))
    }

    /// Pads the current byte with zero bits
    pub fn align(&mut self) -> io::Result<()> {
        if !self.is_aligned() {
            self.write_bits(0, 8 - self.bit_pos)?;
        }

        Ok(())
    }

    /// Pads with the RBSP stop bit followed by zero bits up to the byte
    /// boundary.
    pub fn write_trailing_bits(&mut self) -> io::Result<()> {
        self.write_bit(true)?;
        self.align()
    }

    /// Aligns the writer and returns the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.align()?;
        Ok(self.writer)
    }
}

impl<W> BitWriter<W> {
    /// Creates a new BitWriter from a writer
    pub const fn new(writer: W) -> Self {
        Self {
            bit_pos: 0,
            current_byte: 0,
            writer,
        }
    }

    /// Returns the current bit position (0-7)
    #[inline(always)]
    #[must_use]
    pub const fn bit_pos(&self) -> u8 {
        self.bit_pos
    }

    /// Checks if the writer is aligned to the byte boundary
    #[inline(always)]
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Returns a reference to the underlying writer
    #[inline(always)]
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.writer
    }
}
