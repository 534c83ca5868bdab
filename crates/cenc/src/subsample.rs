//! Subsample maps and the per-track auxiliary information buffer.

use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::error::{CencError, Result};

/// Largest auxiliary information entry a `saiz` size table can describe.
pub const MAX_AUX_INFO_SIZE: usize = u8::MAX as usize;

/// Serialized size of one subsample entry.
pub const SUBSAMPLE_ENTRY_SIZE: usize = 6;

/// A run of clear bytes followed by a run of encrypted bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subsample {
    pub clear_bytes: u16,
    pub encrypted_bytes: u32,
}

impl Subsample {
    pub const fn new(clear_bytes: u16, encrypted_bytes: u32) -> Self {
        Self {
            clear_bytes,
            encrypted_bytes,
        }
    }

    pub const fn len(&self) -> usize {
        self.clear_bytes as usize + self.encrypted_bytes as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects subsamples of one sample while its NAL units are walked.
///
/// Clear bytes accumulate until a protected region closes the entry. Clear
/// runs that do not fit in 16 bits are emitted as extra clear-only entries.
#[derive(Debug, Default)]
pub struct SubsampleBuilder {
    clear_bytes: usize,
    subsamples: Vec<Subsample>,
}

impl SubsampleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clear(&mut self, bytes: usize) {
        self.clear_bytes += bytes;
    }

    /// Closes the current entry with `encrypted_bytes` protected bytes.
    pub fn add_encrypted(&mut self, encrypted_bytes: usize) -> Result<()> {
        let encrypted =
            u32::try_from(encrypted_bytes).map_err(|_| CencError::SampleTooLarge(encrypted_bytes))?;
        self.flush_clear();
        self.subsamples
            .push(Subsample::new(self.clear_bytes as u16, encrypted));
        self.clear_bytes = 0;
        Ok(())
    }

    /// Closes the last entry. A sample without any protected region still
    /// gets one clear-only entry.
    pub fn finish(mut self) -> Vec<Subsample> {
        if self.clear_bytes > 0 || self.subsamples.is_empty() {
            self.flush_clear();
            self.subsamples
                .push(Subsample::new(self.clear_bytes as u16, 0));
        }
        self.subsamples
    }

    /// Leaves at most `u16::MAX` clear bytes pending.
    fn flush_clear(&mut self) {
        while self.clear_bytes > u16::MAX as usize {
            self.subsamples.push(Subsample::new(u16::MAX, 0));
            self.clear_bytes -= u16::MAX as usize;
        }
    }
}

/// Auxiliary information of one encrypted sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleAuxInfo {
    /// Per-sample IV, empty for constant IV schemes
    pub iv: Vec<u8>,
    /// Clear/encrypted map of the sample, empty when the whole sample is
    /// encrypted
    pub subsamples: Vec<Subsample>,
}

impl SampleAuxInfo {
    pub fn clear_bytes(&self) -> usize {
        self.subsamples.iter().map(|s| s.clear_bytes as usize).sum()
    }

    pub fn encrypted_bytes(&self) -> usize {
        self.subsamples.iter().map(|s| s.encrypted_bytes as usize).sum()
    }

    /// Sample size described by the subsample map.
    pub fn total_bytes(&self) -> usize {
        self.subsamples.iter().map(Subsample::len).sum()
    }

    /// Size of the `senc` entry for this sample.
    pub fn serialized_size(&self, with_subsamples: bool) -> usize {
        if with_subsamples {
            self.iv.len() + 2 + self.subsamples.len() * SUBSAMPLE_ENTRY_SIZE
        } else {
            self.iv.len()
        }
    }

    /// Writes the `senc` entry: the IV, then the subsample count and entries
    /// when `with_subsamples` is set.
    pub fn write_to<W: Write>(&self, writer: &mut W, with_subsamples: bool) -> io::Result<()> {
        writer.write_all(&self.iv)?;
        if with_subsamples {
            let count = u16::try_from(self.subsamples.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many subsamples"))?;
            writer.write_u16::<BigEndian>(count)?;
            for subsample in &self.subsamples {
                writer.write_u16::<BigEndian>(subsample.clear_bytes)?;
                writer.write_u32::<BigEndian>(subsample.encrypted_bytes)?;
            }
        }
        Ok(())
    }
}

/// Per-track buffer of serialized [`SampleAuxInfo`] entries and their sizes,
/// the contents of `senc` and `saiz`.
#[derive(Debug, Clone)]
pub struct AuxInfoAccumulator {
    data: Vec<u8>,
    sizes: Vec<u8>,
    iv_size: u8,
    use_subsamples: bool,
}

impl AuxInfoAccumulator {
    pub fn new(iv_size: u8, use_subsamples: bool) -> Self {
        Self {
            data: Vec::new(),
            sizes: Vec::new(),
            iv_size,
            use_subsamples,
        }
    }

    /// Serializes one entry without recording it.
    pub fn encode(&self, info: &SampleAuxInfo) -> Result<Vec<u8>> {
        let size = info.serialized_size(self.use_subsamples);
        if size > MAX_AUX_INFO_SIZE {
            return Err(CencError::AuxInfoTooLarge(size));
        }

        let mut entry = Vec::with_capacity(size);
        info.write_to(&mut entry, self.use_subsamples)?;
        Ok(entry)
    }

    /// Makes room for one more entry of `entry_size` bytes, so that the
    /// following [`append`](Self::append) does not allocate.
    pub fn reserve(&mut self, entry_size: usize) -> Result<()> {
        self.data.try_reserve(entry_size)?;
        self.sizes.try_reserve(1)?;
        Ok(())
    }

    /// Records an entry produced by [`encode`](Self::encode).
    pub fn append(&mut self, entry: &[u8]) {
        self.data.extend_from_slice(entry);
        self.sizes.push(entry.len() as u8);
    }

    /// Serializes and records one entry.
    pub fn push(&mut self, info: &SampleAuxInfo) -> Result<()> {
        let entry = self.encode(info)?;
        self.reserve(entry.len())?;
        self.append(&entry);
        Ok(())
    }

    /// Concatenated entries, the `senc` payload after the sample count.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of every entry in sample order.
    pub fn sizes(&self) -> &[u8] {
        &self.sizes
    }

    pub fn sample_count(&self) -> usize {
        self.sizes.len()
    }

    pub const fn iv_size(&self) -> u8 {
        self.iv_size
    }

    pub const fn use_subsamples(&self) -> bool {
        self.use_subsamples
    }

    /// `default_sample_info_size` of `saiz`. Zero means entries vary and a
    /// size table follows.
    pub const fn default_sample_info_size(&self) -> u8 {
        if self.use_subsamples || self.iv_size == 0 {
            0
        } else {
            self.iv_size
        }
    }
}
