//! ISO-BMFF boxes describing an encrypted track.
//!
//! All boxes are written with a 32-bit size that is patched once the box
//! content is known, so the writer has to be seekable.

use std::io::{self, Seek, SeekFrom, Write};

use byteorder::{BigEndian, WriteBytesExt};
use tracing::debug;

use crate::config::{KEY_SIZE, Pattern, Scheme};
use crate::error::Result;
use crate::subsample::AuxInfoAccumulator;

/// `senc` flag signalling subsample entries.
pub const SENC_USE_SUBSAMPLES: u32 = 0x2;

/// `scheme_version` written to `schm`.
pub const SCHEME_VERSION: u32 = 0x0001_0000;

/// Starts a box by writing a placeholder size and its type. Returns the
/// position of the box for [`end_box`].
pub fn begin_box<W: Write + Seek>(writer: &mut W, box_type: &[u8; 4]) -> io::Result<u64> {
    let start = writer.stream_position()?;
    writer.write_u32::<BigEndian>(0)?;
    writer.write_all(box_type)?;
    Ok(start)
}

/// Patches the size of the box started at `start` and moves back to its end.
pub fn end_box<W: Write + Seek>(writer: &mut W, start: u64) -> io::Result<()> {
    let end = writer.stream_position()?;
    let size = u32::try_from(end - start)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "box size exceeds 32 bits"))?;

    writer.seek(SeekFrom::Start(start))?;
    writer.write_u32::<BigEndian>(size)?;
    writer.seek(SeekFrom::Start(end))?;
    Ok(())
}

fn write_full_box_header<W: Write>(writer: &mut W, version: u8, flags: u32) -> io::Result<()> {
    writer.write_u8(version)?;
    writer.write_u24::<BigEndian>(flags)
}

fn entry_count(count: usize) -> io::Result<u32> {
    u32::try_from(count)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "too many samples"))
}

/// Writes `senc` and returns the absolute position of its first sample
/// entry, the offset `saio` points at.
pub fn write_senc<W: Write + Seek>(writer: &mut W, aux: &AuxInfoAccumulator) -> Result<u64> {
    let flags = if aux.use_subsamples() {
        SENC_USE_SUBSAMPLES
    } else {
        0
    };

    let start = begin_box(writer, b"senc")?;
    write_full_box_header(writer, 0, flags)?;
    writer.write_u32::<BigEndian>(entry_count(aux.sample_count())?)?;
    let offset = writer.stream_position()?;
    writer.write_all(aux.data())?;
    end_box(writer, start)?;

    debug!(
        samples = aux.sample_count(),
        bytes = aux.data().len(),
        offset,
        "Wrote senc"
    );
    Ok(offset)
}

/// Writes `saio` with a single offset. Version 1 is used only when the offset
/// does not fit in 32 bits.
pub fn write_saio<W: Write + Seek>(writer: &mut W, offset: u64) -> Result<()> {
    let start = begin_box(writer, b"saio")?;
    match u32::try_from(offset) {
        Ok(offset) => {
            write_full_box_header(writer, 0, 0)?;
            writer.write_u32::<BigEndian>(1)?;
            writer.write_u32::<BigEndian>(offset)?;
        }
        Err(_) => {
            write_full_box_header(writer, 1, 0)?;
            writer.write_u32::<BigEndian>(1)?;
            writer.write_u64::<BigEndian>(offset)?;
        }
    }
    end_box(writer, start)?;
    Ok(())
}

/// Writes `saiz`. The size table is only present when entries vary in size.
pub fn write_saiz<W: Write + Seek>(writer: &mut W, aux: &AuxInfoAccumulator) -> Result<()> {
    let default_size = aux.default_sample_info_size();

    let start = begin_box(writer, b"saiz")?;
    write_full_box_header(writer, 0, 0)?;
    writer.write_u8(default_size)?;
    writer.write_u32::<BigEndian>(entry_count(aux.sample_count())?)?;
    if default_size == 0 {
        writer.write_all(aux.sizes())?;
    }
    end_box(writer, start)?;
    Ok(())
}

/// Contents of `tenc`, the default encryption parameters of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackEncryptionBox {
    pub scheme: Scheme,
    pub kid: [u8; KEY_SIZE],
    /// Written for cbcs only
    pub pattern: Pattern,
    /// Written for cbcs only
    pub constant_iv: [u8; KEY_SIZE],
}

impl TrackEncryptionBox {
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let start = begin_box(writer, b"tenc")?;
        match self.scheme {
            Scheme::Cenc => {
                write_full_box_header(writer, 0, 0)?;
                writer.write_u8(0)?; // reserved
                writer.write_u8(0)?; // reserved
            }
            Scheme::Cbcs => {
                write_full_box_header(writer, 1, 0)?;
                writer.write_u8(0)?; // reserved
                writer.write_u8(self.pattern.as_byte())?;
            }
        }
        writer.write_u8(1)?; // default_isProtected
        writer.write_u8(self.scheme.per_sample_iv_size())?;
        writer.write_all(&self.kid)?;
        if self.scheme == Scheme::Cbcs {
            writer.write_u8(KEY_SIZE as u8)?;
            writer.write_all(&self.constant_iv)?;
        }
        end_box(writer, start)?;
        Ok(())
    }
}

/// Writes `sinf` with `frma`, `schm` and `schi`/`tenc`. `original_format` is
/// the sample entry type the encrypted entry replaces, such as `avc1`.
pub fn write_sinf<W: Write + Seek>(
    writer: &mut W,
    original_format: [u8; 4],
    tenc: &TrackEncryptionBox,
) -> Result<()> {
    let sinf = begin_box(writer, b"sinf")?;

    let frma = begin_box(writer, b"frma")?;
    writer.write_all(&original_format)?;
    end_box(writer, frma)?;

    let schm = begin_box(writer, b"schm")?;
    write_full_box_header(writer, 0, 0)?;
    writer.write_all(&tenc.scheme.fourcc())?;
    writer.write_u32::<BigEndian>(SCHEME_VERSION)?;
    end_box(writer, schm)?;

    let schi = begin_box(writer, b"schi")?;
    tenc.write(writer)?;
    end_box(writer, schi)?;

    end_box(writer, sinf)?;
    debug!(scheme = %tenc.scheme, "Wrote sinf");
    Ok(())
}
