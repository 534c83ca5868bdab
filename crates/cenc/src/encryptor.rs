//! Per-track encryption driver.

use std::io::{Seek, Write};

use byteorder::{BigEndian, WriteBytesExt};
use h264::{H264Error, NalFormat, NalScanner, ParameterSetStore, slice_header_size};
use tracing::{debug, trace, warn};

use crate::boxes::{self, TrackEncryptionBox};
use crate::cipher::{SampleCipher, TrackCipher};
use crate::config::{EncryptionConfig, KEY_SIZE};
use crate::error::{CencError, Result};
use crate::subsample::{AuxInfoAccumulator, SampleAuxInfo, Subsample, SubsampleBuilder};

/// Width of the length fields written in place of Annex-B start codes.
pub const OUTPUT_LENGTH_SIZE: usize = 4;

/// One contiguous piece of an output sample.
enum Piece<'a> {
    Clear(&'a [u8]),
    LengthPrefix(u32),
    Encrypted(&'a [u8]),
}

impl Piece<'_> {
    const fn len(&self) -> usize {
        match self {
            Self::Clear(bytes) | Self::Encrypted(bytes) => bytes.len(),
            Self::LengthPrefix(_) => OUTPUT_LENGTH_SIZE,
        }
    }
}

/// Encrypts the samples of one H.264 track and collects what the container
/// needs to describe them.
///
/// Samples must be passed in decode order. A sample that fails leaves the
/// encryptor as it was, so the caller can drop it and carry on.
pub struct TrackEncryptor {
    config: EncryptionConfig,
    store: ParameterSetStore,
    cipher: TrackCipher,
    aux: AuxInfoAccumulator,
    initial_iv: [u8; KEY_SIZE],
}

impl TrackEncryptor {
    /// Creates an encryptor for a track whose decoder configuration is
    /// `extradata`, either an avcC record or Annex-B SPS/PPS units.
    pub fn new(config: EncryptionConfig, extradata: &[u8]) -> Result<Self> {
        let store = ParameterSetStore::from_extradata(extradata)?;
        Self::with_store(config, store)
    }

    /// Creates an encryptor with an already populated parameter set store.
    pub fn with_store(config: EncryptionConfig, store: ParameterSetStore) -> Result<Self> {
        config.validate()?;

        let initial_iv = match config.iv {
            Some(iv) => iv,
            None if config.bitexact => [0; KEY_SIZE],
            None => rand::random(),
        };
        let cipher = TrackCipher::new(config.scheme, config.key, initial_iv, config.pattern)?;
        let aux = AuxInfoAccumulator::new(config.scheme.per_sample_iv_size(), config.use_subsamples);

        debug!(
            %config,
            sps = store.sps_count(),
            pps = store.pps_count(),
            "Created track encryptor"
        );

        Ok(Self {
            config,
            store,
            cipher,
            aux,
            initial_iv,
        })
    }

    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }

    pub fn store(&self) -> &ParameterSetStore {
        &self.store
    }

    /// Mutable access to the store, for parameter sets that arrive in band.
    pub fn store_mut(&mut self) -> &mut ParameterSetStore {
        &mut self.store
    }

    pub fn aux_info(&self) -> &AuxInfoAccumulator {
        &self.aux
    }

    pub fn sample_count(&self) -> usize {
        self.aux.sample_count()
    }

    /// IV of the first sample for cenc, the constant IV for cbcs.
    pub const fn initial_iv(&self) -> &[u8; KEY_SIZE] {
        &self.initial_iv
    }

    /// Framing of MP4 samples of this track, taken from the avcC record when
    /// there was one.
    pub fn sample_format(&self) -> NalFormat {
        NalFormat::LengthPrefixed {
            length_size: self
                .store
                .nal_length_size()
                .unwrap_or(OUTPUT_LENGTH_SIZE as u8),
        }
    }

    /// Encrypts one access unit into `sink` and records its auxiliary
    /// information.
    ///
    /// With subsamples enabled the NAL framing, non-VCL units and slice
    /// headers stay in the clear and Annex-B input is rewritten with 4 byte
    /// length prefixes. Otherwise the sample is encrypted as a whole.
    ///
    /// The sample is parsed completely before anything is written, so parse
    /// errors never leave partial output behind.
    pub fn encrypt_sample<W: Write>(
        &mut self,
        sample: &[u8],
        format: NalFormat,
        sink: &mut W,
    ) -> Result<SampleAuxInfo> {
        let (pieces, subsamples) = if self.config.use_subsamples {
            self.plan(sample, format)?
        } else {
            let size =
                u32::try_from(sample.len()).map_err(|_| CencError::SampleTooLarge(sample.len()))?;
            (vec![Piece::Encrypted(sample)], vec![Subsample::new(0, size)])
        };

        let info = SampleAuxInfo {
            iv: self.cipher.sample_iv().to_vec(),
            subsamples,
        };
        let entry = self.aux.encode(&info)?;
        self.aux.reserve(entry.len())?;

        self.cipher.begin_sample();
        for piece in &pieces {
            match piece {
                Piece::Clear(bytes) => sink.write_all(bytes)?,
                Piece::LengthPrefix(length) => sink.write_u32::<BigEndian>(*length)?,
                Piece::Encrypted(bytes) => self.cipher.encrypt_region(bytes, sink)?,
            }
        }
        let size = pieces.iter().map(Piece::len).sum();
        self.cipher.end_sample(size);
        self.aux.append(&entry);

        trace!(
            sample = self.aux.sample_count(),
            size,
            subsamples = info.subsamples.len(),
            encrypted = info.encrypted_bytes(),
            "Encrypted sample"
        );
        Ok(info)
    }

    /// Splits a sample into clear and encrypted pieces along its NAL units.
    fn plan<'a>(
        &self,
        sample: &'a [u8],
        format: NalFormat,
    ) -> Result<(Vec<Piece<'a>>, Vec<Subsample>)> {
        let mut pieces = Vec::new();
        let mut builder = SubsampleBuilder::new();
        let mut vcl_units = 0;

        for unit in NalScanner::new(sample, format) {
            let unit = unit?;

            match format {
                NalFormat::AnnexB(_) => {
                    let length = u32::try_from(unit.len())
                        .map_err(|_| CencError::SampleTooLarge(unit.len()))?;
                    pieces.push(Piece::LengthPrefix(length));
                    builder.add_clear(OUTPUT_LENGTH_SIZE);
                }
                NalFormat::LengthPrefixed { .. } => {
                    pieces.push(Piece::Clear(
                        &sample[unit.offset - unit.prefix_length..unit.offset],
                    ));
                    builder.add_clear(unit.prefix_length);
                }
            }

            if !unit.is_vcl() {
                trace!(nal_type = ?unit.nal_type, size = unit.len(), "Leaving NAL unit clear");
                pieces.push(Piece::Clear(unit.payload));
                builder.add_clear(unit.len());
                continue;
            }

            let header_size = slice_header_size(&self.store, unit.payload)?;
            let (header, body) = unit
                .payload
                .split_at_checked(header_size)
                .ok_or(H264Error::BufferExhausted)?;
            pieces.push(Piece::Clear(header));
            pieces.push(Piece::Encrypted(body));
            builder.add_clear(header.len());
            builder.add_encrypted(body.len())?;
            vcl_units += 1;
        }

        if vcl_units == 0 {
            warn!(size = sample.len(), "Sample has no VCL NAL units, leaving it clear");
        }

        Ok((pieces, builder.finish()))
    }

    /// Contents of the track's `tenc` box.
    pub fn track_encryption_box(&self) -> TrackEncryptionBox {
        TrackEncryptionBox {
            scheme: self.config.scheme,
            kid: self.config.kid,
            pattern: self.config.pattern,
            constant_iv: self.initial_iv,
        }
    }

    /// Writes `senc`, `saio` and `saiz` for every sample encrypted so far.
    pub fn write_aux_boxes<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        let offset = boxes::write_senc(writer, &self.aux)?;
        boxes::write_saio(writer, offset)?;
        boxes::write_saiz(writer, &self.aux)?;

        debug!(
            samples = self.aux.sample_count(),
            offset,
            "Wrote auxiliary information boxes"
        );
        Ok(())
    }

    /// Writes the `sinf` box for the encrypted sample entry, which replaces
    /// an entry of type `original_format`.
    pub fn write_sinf<W: Write + Seek>(&self, writer: &mut W, original_format: [u8; 4]) -> Result<()> {
        boxes::write_sinf(writer, original_format, &self.track_encryption_box())
    }
}
