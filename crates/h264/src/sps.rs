use crate::bitstream::RbspReader;
use crate::error::{H264Error, ParameterSetKind, Result};

/// Number of SPS slots (`seq_parameter_set_id` is in `0..=31`).
pub const MAX_SPS_COUNT: u32 = 32;

/// Profiles whose SPS carries the chroma format, bit depths and scaling matrix.
const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// The subset of a Sequence Parameter Set needed to walk a slice header.
///
/// ISO/IEC 14496-10 - 7.3.2.1.1
///
/// Everything after `frame_mbs_only_flag` (VUI, cropping, ...) has no influence
/// on the slice header layout and is not parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsRecord {
    /// `seq_parameter_set_id`
    pub id: u8,

    /// `profile_idc`
    pub profile_idc: u8,

    /// `chroma_format_idc`, 1 (4:2:0) when the profile does not signal it.
    pub chroma_format_idc: u8,

    /// `ChromaArrayType`: `chroma_format_idc`, or 0 when the colour planes
    /// are coded separately.
    pub chroma_array_type: u8,

    /// `separate_colour_plane_flag`. When set every slice header carries a
    /// 2 bit `colour_plane_id`.
    pub separate_colour_plane_flag: bool,

    /// `log2_max_frame_num_minus4 + 4`, the width of `frame_num` in bits.
    pub log2_max_frame_num: u8,

    /// `pic_order_cnt_type` (0, 1 or 2)
    pub pic_order_cnt_type: u8,

    /// `log2_max_pic_order_cnt_lsb_minus4 + 4`, only meaningful for
    /// `pic_order_cnt_type == 0`.
    pub log2_max_pic_order_cnt_lsb: u8,

    /// `delta_pic_order_always_zero_flag`, only meaningful for
    /// `pic_order_cnt_type == 1`.
    pub delta_pic_order_always_zero_flag: bool,

    /// `pic_width_in_mbs_minus1 + 1`
    pub pic_width_in_mbs: u32,

    /// `pic_height_in_map_units_minus1 + 1`
    pub pic_height_in_map_units: u32,

    /// `frame_mbs_only_flag`
    pub frame_mbs_only_flag: bool,
}

impl SpsRecord {
    /// Parses an SPS NAL unit, starting at its NAL header byte.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let mut reader = RbspReader::new(nal)?;

        reader.skip_bits(8)?; // forbidden_zero_bit, nal_ref_idc, nal_unit_type
        let profile_idc = reader.read_bits(8)? as u8;
        reader.skip_bits(8)?; // constraint_set flags, reserved_zero_2bits
        reader.skip_bits(8)?; // level_idc

        let id = reader.read_ue()?;
        if id >= MAX_SPS_COUNT {
            return Err(H264Error::BadId {
                kind: ParameterSetKind::Sps,
                id,
            });
        }

        let mut chroma_format_idc = 1;
        let mut chroma_array_type = 1;
        let mut separate_colour_plane_flag = false;

        if HIGH_PROFILES.contains(&profile_idc) {
            chroma_format_idc = reader.read_ue()?;
            if chroma_format_idc > 3 {
                return Err(H264Error::InvalidData("chroma_format_idc out of range"));
            }
            chroma_array_type = chroma_format_idc;

            if chroma_format_idc == 3 {
                separate_colour_plane_flag = reader.read_flag()?;
                if separate_colour_plane_flag {
                    chroma_array_type = 0;
                }
            }

            reader.skip_golomb(2)?; // bit_depth_luma_minus8, bit_depth_chroma_minus8
            reader.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

            if reader.read_flag()? {
                let list_count = if chroma_format_idc == 3 { 12 } else { 8 };
                for index in 0..list_count {
                    if reader.read_flag()? {
                        let size = if index < 6 { 16 } else { 64 };
                        skip_scaling_list(&mut reader, size)?;
                    }
                }
            }
        }

        let log2_max_frame_num = reader.read_ue()?;
        if log2_max_frame_num > 12 {
            return Err(H264Error::InvalidData("log2_max_frame_num_minus4 out of range"));
        }

        let pic_order_cnt_type = reader.read_ue()?;
        let mut log2_max_pic_order_cnt_lsb = 0;
        let mut delta_pic_order_always_zero_flag = false;

        match pic_order_cnt_type {
            0 => {
                let lsb_minus4 = reader.read_ue()?;
                if lsb_minus4 > 12 {
                    return Err(H264Error::InvalidData(
                        "log2_max_pic_order_cnt_lsb_minus4 out of range",
                    ));
                }
                log2_max_pic_order_cnt_lsb = lsb_minus4 as u8 + 4;
            }
            1 => {
                delta_pic_order_always_zero_flag = reader.read_flag()?;
                reader.skip_golomb(2)?; // offset_for_non_ref_pic, offset_for_top_to_bottom_field
                let cycle_len = reader.read_ue()?;
                if cycle_len > 255 {
                    return Err(H264Error::InvalidData(
                        "num_ref_frames_in_pic_order_cnt_cycle out of range",
                    ));
                }
                reader.skip_golomb(cycle_len)?; // offset_for_ref_frame[i]
            }
            2 => {}
            _ => return Err(H264Error::InvalidData("pic_order_cnt_type out of range")),
        }

        reader.skip_golomb(1)?; // max_num_ref_frames
        reader.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag
        let pic_width_in_mbs = reader.read_ue()?.saturating_add(1);
        let pic_height_in_map_units = reader.read_ue()?.saturating_add(1);
        let frame_mbs_only_flag = reader.read_flag()?;

        Ok(Self {
            id: id as u8,
            profile_idc,
            chroma_format_idc: chroma_format_idc as u8,
            chroma_array_type: chroma_array_type as u8,
            separate_colour_plane_flag,
            log2_max_frame_num: log2_max_frame_num as u8 + 4,
            pic_order_cnt_type: pic_order_cnt_type as u8,
            log2_max_pic_order_cnt_lsb,
            delta_pic_order_always_zero_flag,
            pic_width_in_mbs,
            pic_height_in_map_units,
            frame_mbs_only_flag,
        })
    }

    /// `PicSizeInMapUnits`
    pub const fn pic_size_in_map_units(&self) -> u64 {
        self.pic_width_in_mbs as u64 * self.pic_height_in_map_units as u64
    }
}

/// Walks one `scaling_list()` of `size` entries without keeping the values and
/// returns the number of bits it occupied.
///
/// The list ends early once a delta makes `nextScale` zero, after which the
/// remaining entries repeat the last scale and are not coded.
fn skip_scaling_list(reader: &mut RbspReader<'_>, size: usize) -> Result<u64> {
    let start = reader.bits_consumed();
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_se()?;
            next_scale = last_scale.wrapping_add(delta_scale) & 0xff;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }

    Ok(reader.bits_consumed() - start)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes_util::BitWriter;
    use expgolomb::BitWriterExpGolombExt;

    use super::*;

    #[test]
    fn test_parse_main_profile_sps() {
        let nal = [
            0x67, 0x4d, 0x40, 0x29, 0x96, 0x52, 0x80, 0xf0, 0x04, 0x4f, 0xcb, 0x35, 0x01, 0x01,
            0x01, 0x40, 0x00, 0x00, 0xfa, 0x40, 0x00, 0x2e, 0xe0, 0x21,
        ];

        let sps = SpsRecord::parse(&nal).unwrap();

        insta::assert_debug_snapshot!(sps, @r"
        SpsRecord {
            id: 0,
            profile_idc: 77,
            chroma_format_idc: 1,
            chroma_array_type: 1,
            separate_colour_plane_flag: false,
            log2_max_frame_num: 8,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb: 8,
            delta_pic_order_always_zero_flag: false,
            pic_width_in_mbs: 120,
            pic_height_in_map_units: 68,
            frame_mbs_only_flag: true,
        }
        ");
        assert_eq!(sps.pic_size_in_map_units(), 8160);
    }

    #[test]
    fn test_parse_high_profile_sps() {
        let nal = [
            0x67, 0x64, 0x00, 0x1f, 0xac, 0xd9, 0x40, 0x50, 0x05, 0xbb, 0x01, 0x10, 0x00, 0x00,
            0x3e, 0x90, 0x00, 0x0b, 0xb8, 0x00, 0xf1, 0x83, 0x19, 0x60,
        ];

        let sps = SpsRecord::parse(&nal).unwrap();

        insta::assert_debug_snapshot!(sps, @r"
        SpsRecord {
            id: 0,
            profile_idc: 100,
            chroma_format_idc: 1,
            chroma_array_type: 1,
            separate_colour_plane_flag: false,
            log2_max_frame_num: 4,
            pic_order_cnt_type: 0,
            log2_max_pic_order_cnt_lsb: 6,
            delta_pic_order_always_zero_flag: false,
            pic_width_in_mbs: 80,
            pic_height_in_map_units: 45,
            frame_mbs_only_flag: true,
        }
        ");
    }

    fn build_sps(profile_idc: u8, body: impl FnOnce(&mut BitWriter<Vec<u8>>)) -> Vec<u8> {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0x67, 8).unwrap();
        writer.write_bits(profile_idc as u64, 8).unwrap();
        writer.write_bits(0, 8).unwrap();
        writer.write_bits(40, 8).unwrap();
        body(&mut writer);
        writer.write_trailing_bits().unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_separate_colour_planes_and_scaling_lists() {
        let nal = build_sps(244, |w| {
            w.write_exp_golomb(3).unwrap(); // seq_parameter_set_id
            w.write_exp_golomb(3).unwrap(); // chroma_format_idc
            w.write_bit(true).unwrap(); // separate_colour_plane_flag
            w.write_exp_golomb(2).unwrap();
            w.write_exp_golomb(2).unwrap();
            w.write_bit(false).unwrap();
            w.write_bit(true).unwrap(); // seq_scaling_matrix_present_flag
            for index in 0..12 {
                let present = index == 0 || index == 7;
                w.write_bit(present).unwrap();
                if index == 0 {
                    // 16 explicit deltas
                    for _ in 0..16 {
                        w.write_signed_exp_golomb(1).unwrap();
                    }
                } else if index == 7 {
                    // -8 turns nextScale to zero and ends the list
                    w.write_signed_exp_golomb(-8).unwrap();
                }
            }
            w.write_exp_golomb(0).unwrap(); // log2_max_frame_num_minus4
            w.write_exp_golomb(1).unwrap(); // pic_order_cnt_type
            w.write_bit(true).unwrap(); // delta_pic_order_always_zero_flag
            w.write_signed_exp_golomb(-1).unwrap();
            w.write_signed_exp_golomb(2).unwrap();
            w.write_exp_golomb(2).unwrap();
            w.write_signed_exp_golomb(5).unwrap();
            w.write_signed_exp_golomb(-5).unwrap();
            w.write_exp_golomb(4).unwrap(); // max_num_ref_frames
            w.write_bit(false).unwrap();
            w.write_exp_golomb(21).unwrap();
            w.write_exp_golomb(16).unwrap();
            w.write_bit(false).unwrap(); // frame_mbs_only_flag
        });

        let sps = SpsRecord::parse(&nal).unwrap();
        assert_eq!(sps.id, 3);
        assert_eq!(sps.chroma_format_idc, 3);
        assert_eq!(sps.chroma_array_type, 0);
        assert!(sps.separate_colour_plane_flag);
        assert_eq!(sps.pic_order_cnt_type, 1);
        assert!(sps.delta_pic_order_always_zero_flag);
        assert_eq!(sps.pic_width_in_mbs, 22);
        assert_eq!(sps.pic_height_in_map_units, 17);
        assert!(!sps.frame_mbs_only_flag);
    }

    #[test]
    fn test_scaling_list_stops_at_zero() {
        let mut writer = BitWriter::<Vec<u8>>::default();
        writer.write_bits(0xff, 8).unwrap();
        writer.write_signed_exp_golomb(-8).unwrap(); // 9 bits
        writer.write_bits(0b1010, 4).unwrap();
        let data = writer.finish().unwrap();

        let mut reader = RbspReader::new(&data).unwrap();
        reader.skip_bits(8).unwrap();
        assert_eq!(skip_scaling_list(&mut reader, 64).unwrap(), 9);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    }

    #[test]
    fn test_sps_id_out_of_range() {
        let nal = build_sps(66, |w| {
            w.write_exp_golomb(32).unwrap();
        });

        assert!(matches!(
            SpsRecord::parse(&nal),
            Err(H264Error::BadId {
                kind: ParameterSetKind::Sps,
                id: 32
            })
        ));
    }

    #[test]
    fn test_truncated_sps() {
        let nal = [0x67, 0x4d, 0x40, 0x29, 0x96, 0x52];
        assert!(matches!(SpsRecord::parse(&nal), Err(H264Error::BufferExhausted)));
        assert!(matches!(SpsRecord::parse(&[]), Err(H264Error::TooShort)));
    }
}
