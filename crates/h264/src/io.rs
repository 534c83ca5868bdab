use std::io;

/// Wraps a NAL payload and strips (when reading) or inserts (when writing)
/// emulation prevention bytes.
///
/// The reader side also counts every raw byte it has pulled from the inner
/// reader, escape bytes included. Because bytes are pulled one at a time and
/// only on demand, [`EmulationPreventionIo::raw_bytes`] is the escaped length
/// of everything handed out so far.
pub struct EmulationPreventionIo<I> {
    inner: I,
    zero_count: u8,
    raw_bytes: u64,
}

impl<I> EmulationPreventionIo<I> {
    /// Wraps `inner`. Every call reads or writes a single byte on the inner io,
    /// so it should be an in-memory reader or writer.
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            zero_count: 0,
            raw_bytes: 0,
        }
    }

    /// Number of bytes taken from the inner reader so far.
    pub const fn raw_bytes(&self) -> u64 {
        self.raw_bytes
    }

    /// Unwraps the inner io.
    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: io::Write> io::Write for EmulationPreventionIo<I> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if self.zero_count >= 2 && byte <= 0x03 {
                self.inner.write_all(&[0x03])?;
                self.raw_bytes += 1;
                self.zero_count = 0;
            }

            self.inner.write_all(&[byte])?;
            self.raw_bytes += 1;
            self.zero_count = if byte == 0x00 { self.zero_count + 1 } else { 0 };
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<I: io::Read> io::Read for EmulationPreventionIo<I> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut read_size = 0;
        let mut one_byte = [0; 1];
        while read_size < buf.len() {
            if self.inner.read(&mut one_byte)? == 0 {
                break;
            }
            self.raw_bytes += 1;

            let byte = one_byte[0];
            if byte == 0x03 && self.zero_count >= 2 {
                self.zero_count = 0;
                continue;
            }
            self.zero_count = if byte == 0x00 { self.zero_count + 1 } else { 0 };

            buf[read_size] = byte;
            read_size += 1;
        }

        Ok(read_size)
    }
}
