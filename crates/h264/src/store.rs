use std::collections::BTreeMap;
use std::io;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::AVCDecoderConfigurationRecord;
use crate::error::{H264Error, ParameterSetKind, Result};
use crate::nal::{NalFormat, NalScanner, ZeroPadding, starts_with_start_code};
use crate::pps::{MAX_PPS_COUNT, PpsRecord};
use crate::sps::SpsRecord;
use crate::NALUnitType;

/// SPS and PPS tables of one elementary stream, keyed by id.
///
/// Built once from the stream's extradata and only read afterwards. A PPS is
/// only ever stored if the SPS it references was stored before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSetStore {
    sps: BTreeMap<u8, SpsRecord>,
    pps: BTreeMap<u8, PpsRecord>,
    nal_length_size: Option<u8>,
}

impl ParameterSetStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from codec extradata.
    ///
    /// Annex-B (start code delimited SPS/PPS) is tried first. If the data does
    /// not start with a start code or one of its units fails to parse, it is
    /// parsed again from scratch as an [`AVCDecoderConfigurationRecord`].
    pub fn from_extradata(extradata: &[u8]) -> Result<Self> {
        if extradata.is_empty() {
            return Err(H264Error::TooShort);
        }

        if starts_with_start_code(extradata) {
            match Self::from_annexb(extradata) {
                Ok(store) => return Ok(store),
                Err(err) => debug!("Annex-B extradata rejected ({err}), trying avcC"),
            }
        }

        let record = AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(
            Bytes::copy_from_slice(extradata),
        ))?;
        Self::from_avcc(&record)
    }

    /// Builds a store from the parameter sets of an `avcC` record and keeps
    /// its NAL length size.
    pub fn from_avcc(record: &AVCDecoderConfigurationRecord) -> Result<Self> {
        let mut store = Self {
            nal_length_size: Some(record.nal_length_size()),
            ..Self::default()
        };

        for nal in record.sps.iter().chain(record.pps.iter()) {
            store.insert_nal(nal)?;
        }

        debug!(
            "Parsed avcC extradata: {} SPS, {} PPS, {} byte NAL lengths",
            store.sps.len(),
            store.pps.len(),
            record.nal_length_size()
        );
        Ok(store)
    }

    fn from_annexb(extradata: &[u8]) -> Result<Self> {
        let mut store = Self::default();

        for unit in NalScanner::new(extradata, NalFormat::AnnexB(ZeroPadding::NextUnit)) {
            store.insert_nal(unit?.payload)?;
        }

        debug!(
            "Parsed Annex-B extradata: {} SPS, {} PPS",
            store.sps.len(),
            store.pps.len()
        );
        Ok(store)
    }

    /// Parses and stores one SPS or PPS NAL unit. Other unit types are ignored.
    ///
    /// Returns the type of the unit.
    pub fn insert_nal(&mut self, nal: &[u8]) -> Result<NALUnitType> {
        let header = *nal.first().ok_or(H264Error::TooShort)?;
        let nal_type = NALUnitType::from_header(header);

        match nal_type {
            NALUnitType::SPS => self.insert_sps(SpsRecord::parse(nal)?),
            NALUnitType::PPS => self.insert_pps(PpsRecord::parse(nal)?)?,
            other => trace!("Ignoring {other:?} NAL unit in parameter set data"),
        }

        Ok(nal_type)
    }

    /// Stores an SPS, replacing any earlier SPS with the same id.
    pub fn insert_sps(&mut self, sps: SpsRecord) {
        trace!("Storing SPS {}", sps.id);
        self.sps.insert(sps.id, sps);
    }

    /// Stores a PPS, replacing any earlier PPS with the same id.
    ///
    /// Fails with [`H264Error::MissingParameterSet`] if its SPS is unknown.
    pub fn insert_pps(&mut self, pps: PpsRecord) -> Result<()> {
        if !self.sps.contains_key(&pps.sps_id) {
            return Err(H264Error::MissingParameterSet {
                kind: ParameterSetKind::Sps,
                id: pps.sps_id as u32,
            });
        }

        trace!("Storing PPS {} (SPS {})", pps.id, pps.sps_id);
        self.pps.insert(pps.id, pps);
        Ok(())
    }

    /// Looks up an SPS by id.
    pub fn sps(&self, id: u8) -> Option<&SpsRecord> {
        self.sps.get(&id)
    }

    /// Looks up a PPS by id.
    pub fn pps(&self, id: u8) -> Option<&PpsRecord> {
        self.pps.get(&id)
    }

    /// Resolves a `pic_parameter_set_id` from a slice header to the PPS and
    /// the SPS it activates.
    pub fn resolve(&self, pps_id: u32) -> Result<(&PpsRecord, &SpsRecord)> {
        if pps_id >= MAX_PPS_COUNT {
            return Err(H264Error::BadId {
                kind: ParameterSetKind::Pps,
                id: pps_id,
            });
        }

        let pps = self.pps(pps_id as u8).ok_or(H264Error::MissingParameterSet {
            kind: ParameterSetKind::Pps,
            id: pps_id,
        })?;
        let sps = self.sps(pps.sps_id).ok_or(H264Error::MissingParameterSet {
            kind: ParameterSetKind::Sps,
            id: pps.sps_id as u32,
        })?;

        Ok((pps, sps))
    }

    /// NAL length field size declared by the `avcC` record, if the store was
    /// built from one.
    pub const fn nal_length_size(&self) -> Option<u8> {
        self.nal_length_size
    }

    /// Number of stored SPS.
    pub fn sps_count(&self) -> usize {
        self.sps.len()
    }

    /// Number of stored PPS.
    pub fn pps_count(&self) -> usize {
        self.pps.len()
    }
}
