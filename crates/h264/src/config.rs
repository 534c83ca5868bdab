use std::io::{self, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;

use crate::error::{H264Error, Result};

/// The AVC (H.264) Decoder Configuration Record, the `avcC` form of extradata.
///
/// ISO/IEC 14496-15:2022(E) - 5.3.2.1.2
///
/// Only the fields shared by every profile are kept; the high profile
/// extension that may trail the PPS list is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct AVCDecoderConfigurationRecord {
    /// `configurationVersion`, always 1 in practice.
    pub configuration_version: u8,

    /// `AVCProfileIndication`, the `profile_idc` of the SPS.
    pub profile_indication: u8,

    /// `profile_compatibility`, the constraint flags byte of the SPS.
    pub profile_compatibility: u8,

    /// `AVCLevelIndication`, the `level_idc` of the SPS.
    pub level_indication: u8,

    /// `lengthSizeMinusOne`: samples use `length_size_minus_one + 1` byte NAL
    /// length fields.
    pub length_size_minus_one: u8,

    /// SPS NAL units, each including its NAL header byte.
    pub sps: Vec<Bytes>,

    /// PPS NAL units, each including its NAL header byte.
    pub pps: Vec<Bytes>,
}

impl AVCDecoderConfigurationRecord {
    /// Parses the record from the start of `reader`.
    pub fn parse(reader: &mut io::Cursor<Bytes>) -> Result<Self> {
        let configuration_version = reader.read_u8()?;
        let profile_indication = reader.read_u8()?;
        let profile_compatibility = reader.read_u8()?;
        let level_indication = reader.read_u8()?;
        let length_size_minus_one = reader.read_u8()? & 0b0000_0011;

        let num_of_sps = reader.read_u8()? & 0b0001_1111;
        let sps = (0..num_of_sps)
            .map(|_| read_parameter_set(reader))
            .collect::<Result<Vec<_>>>()?;

        let num_of_pps = reader.read_u8()?;
        let pps = (0..num_of_pps)
            .map(|_| read_parameter_set(reader))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    /// Size in bytes of the NAL length fields in samples described by this record.
    pub const fn nal_length_size(&self) -> u8 {
        self.length_size_minus_one + 1
    }

    /// Serializes the record, with all reserved bits set to one.
    ///
    /// Fails with `InvalidInput` when there are more than 31 SPS, more than
    /// 255 PPS, or a parameter set longer than 65535 bytes.
    pub fn build(&self, writer: &mut impl Write) -> io::Result<()> {
        let num_of_sps = u8::try_from(self.sps.len())
            .ok()
            .filter(|&count| count <= MAX_SPS_IN_RECORD)
            .ok_or_else(|| invalid_input("too many SPS for an avcC record"))?;
        let num_of_pps = u8::try_from(self.pps.len())
            .map_err(|_| invalid_input("too many PPS for an avcC record"))?;

        writer.write_u8(self.configuration_version)?;
        writer.write_u8(self.profile_indication)?;
        writer.write_u8(self.profile_compatibility)?;
        writer.write_u8(self.level_indication)?;
        writer.write_u8(0b1111_1100 | (self.length_size_minus_one & 0b11))?;

        writer.write_u8(0b1110_0000 | num_of_sps)?;
        for sps in &self.sps {
            write_parameter_set(writer, sps)?;
        }

        writer.write_u8(num_of_pps)?;
        for pps in &self.pps {
            write_parameter_set(writer, pps)?;
        }

        Ok(())
    }
}

/// `numOfSequenceParameterSets` is a 5 bit field.
const MAX_SPS_IN_RECORD: u8 = 0b0001_1111;

fn invalid_input(message: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

fn write_parameter_set(writer: &mut impl Write, nal: &[u8]) -> io::Result<()> {
    let length =
        u16::try_from(nal.len()).map_err(|_| invalid_input("parameter set longer than 65535 bytes"))?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(nal)
}

/// Reads a 16 bit length followed by that many bytes, without copying.
fn read_parameter_set(reader: &mut io::Cursor<Bytes>) -> Result<Bytes> {
    let length = reader.read_u16::<BigEndian>()? as usize;
    let start = reader.position() as usize;
    let available = reader.get_ref().len().saturating_sub(start);
    if length > available {
        return Err(H264Error::Truncated {
            needed: length,
            available,
        });
    }

    reader.set_position((start + length) as u64);
    Ok(reader.get_ref().slice(start..start + length))
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_config_parse() {
        let data = Bytes::from(b"\x01d\0\x1f\xff\xe1\0\x19\x67\x64\x00\x1F\xAC\xD9\x41\xE0\x6D\xF9\xE6\xA0\x20\x20\x28\x00\x00\x03\x00\x08\x00\x00\x03\x01\xE0\x01\0\x06h\xeb\xe3\xcb\"\xc0\xfd\xf8\xf8\0".to_vec());

        let config = AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(data)).unwrap();

        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.profile_indication, 100);
        assert_eq!(config.profile_compatibility, 0);
        assert_eq!(config.level_indication, 31);
        assert_eq!(config.nal_length_size(), 4);
        assert_eq!(config.sps.len(), 1);
        assert_eq!(config.sps[0].len(), 25);
        assert_eq!(config.pps.len(), 1);
        assert_eq!(config.pps[0], Bytes::from_static(b"h\xeb\xe3\xcb\"\xc0"));
    }

    #[test]
    fn test_config_build_and_parse() {
        let config = AVCDecoderConfigurationRecord {
            configuration_version: 1,
            profile_indication: 77,
            profile_compatibility: 0x40,
            level_indication: 41,
            length_size_minus_one: 1,
            sps: vec![Bytes::from_static(&[0x67, 0x4d, 0x40, 0x29])],
            pps: vec![
                Bytes::from_static(&[0x68, 0xe9, 0x09, 0x35, 0x20]),
                Bytes::from_static(&[0x68, 0xeb]),
            ],
        };

        let mut built = Vec::new();
        config.build(&mut built).unwrap();
        assert_eq!(&built[..8], &[0x01, 0x4d, 0x40, 0x29, 0xfd, 0xe1, 0x00, 0x04]);

        let parsed = AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(Bytes::from(built))).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.nal_length_size(), 2);
    }

    #[test]
    fn test_config_build_rejects_oversized_lists() {
        let base = AVCDecoderConfigurationRecord {
            configuration_version: 1,
            profile_indication: 77,
            profile_compatibility: 0x40,
            level_indication: 41,
            length_size_minus_one: 3,
            sps: vec![Bytes::from_static(&[0x67, 0x4d, 0x40, 0x29]); 31],
            pps: vec![Bytes::from_static(&[0x68, 0xeb]); 255],
        };
        let mut built = Vec::new();
        base.build(&mut built).unwrap();
        assert_eq!(built[5], 0xff);

        let cases = [
            AVCDecoderConfigurationRecord {
                sps: vec![Bytes::from_static(&[0x67, 0x4d, 0x40, 0x29]); 32],
                ..base.clone()
            },
            AVCDecoderConfigurationRecord {
                pps: vec![Bytes::from_static(&[0x68, 0xeb]); 256],
                ..base.clone()
            },
            AVCDecoderConfigurationRecord {
                pps: vec![Bytes::from(vec![0x68; 65536])],
                ..base.clone()
            },
        ];
        for config in cases {
            let err = config.build(&mut Vec::new()).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_config_truncated_parameter_set() {
        let data = Bytes::from_static(&[0x01, 0x4d, 0x40, 0x29, 0xff, 0xe1, 0x00, 0x10, 0x67, 0x4d]);

        let err = AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            H264Error::Truncated {
                needed: 16,
                available: 2
            }
        ));

        let err = AVCDecoderConfigurationRecord::parse(&mut io::Cursor::new(Bytes::from_static(&[0x01, 0x4d])))
            .unwrap_err();
        assert!(matches!(err, H264Error::BufferExhausted));
    }
}
