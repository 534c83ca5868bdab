use crate::bitstream::RbspReader;
use crate::error::{H264Error, ParameterSetKind, Result};
use crate::sps::MAX_SPS_COUNT;

/// Number of PPS slots (`pic_parameter_set_id` is in `0..=255`).
pub const MAX_PPS_COUNT: u32 = 256;

/// The subset of a Picture Parameter Set needed to walk a slice header.
///
/// ISO/IEC 14496-10 - 7.3.2.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpsRecord {
    /// `pic_parameter_set_id`
    pub id: u8,

    /// `seq_parameter_set_id` of the SPS this PPS refers to.
    pub sps_id: u8,

    /// `entropy_coding_mode_flag` (CABAC when set)
    pub entropy_coding_mode_flag: bool,

    /// `bottom_field_pic_order_in_frame_present_flag`
    pub bottom_field_pic_order_in_frame_present_flag: bool,

    /// `num_slice_groups_minus1`
    pub num_slice_groups_minus1: u32,

    /// `slice_group_map_type`, only meaningful with more than one slice group.
    pub slice_group_map_type: u32,

    /// `slice_group_change_rate_minus1 + 1`, only meaningful for map types 3 to 5.
    pub slice_group_change_rate: u32,

    /// `num_ref_idx_l0_default_active_minus1 + 1` and the same for list 1.
    pub num_ref_idx: [u32; 2],

    /// `weighted_pred_flag`
    pub weighted_pred_flag: bool,

    /// `weighted_bipred_idc`
    pub weighted_bipred_idc: u8,

    /// `deblocking_filter_control_present_flag`
    pub deblocking_filter_control_present_flag: bool,

    /// `redundant_pic_cnt_present_flag`
    pub redundant_pic_cnt_present_flag: bool,
}

impl PpsRecord {
    /// Parses a PPS NAL unit, starting at its NAL header byte.
    ///
    /// This does not check that the referenced SPS exists, the
    /// [`ParameterSetStore`](crate::ParameterSetStore) does.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let mut reader = RbspReader::new(nal)?;

        reader.skip_bits(8)?; // forbidden_zero_bit, nal_ref_idc, nal_unit_type

        let id = reader.read_ue()?;
        if id >= MAX_PPS_COUNT {
            return Err(H264Error::BadId {
                kind: ParameterSetKind::Pps,
                id,
            });
        }

        let sps_id = reader.read_ue()?;
        if sps_id >= MAX_SPS_COUNT {
            return Err(H264Error::BadId {
                kind: ParameterSetKind::Sps,
                id: sps_id,
            });
        }

        let entropy_coding_mode_flag = reader.read_flag()?;
        let bottom_field_pic_order_in_frame_present_flag = reader.read_flag()?;

        let num_slice_groups_minus1 = reader.read_ue()?;
        if num_slice_groups_minus1 > 7 {
            return Err(H264Error::InvalidData("num_slice_groups_minus1 out of range"));
        }

        let mut slice_group_map_type = 0;
        let mut slice_group_change_rate = 0;
        if num_slice_groups_minus1 > 0 {
            slice_group_map_type = reader.read_ue()?;
            match slice_group_map_type {
                // run_length_minus1[iGroup]
                0 => reader.skip_golomb(num_slice_groups_minus1 + 1)?,
                1 => {}
                // top_left[iGroup], bottom_right[iGroup]
                2 => reader.skip_golomb(num_slice_groups_minus1 * 2)?,
                3..=5 => {
                    reader.skip_bits(1)?; // slice_group_change_direction_flag
                    slice_group_change_rate = reader.read_ue()?.saturating_add(1);
                }
                6 => {
                    let pic_size_in_map_units_minus1 = reader.read_ue()?;
                    let id_bits = ceil_log2(num_slice_groups_minus1 + 1);
                    for _ in 0..=pic_size_in_map_units_minus1 {
                        reader.skip_bits(id_bits)?; // slice_group_id[i]
                    }
                }
                _ => return Err(H264Error::InvalidData("slice_group_map_type out of range")),
            }
        }

        let mut num_ref_idx = [0; 2];
        for count in &mut num_ref_idx {
            *count = reader.read_ue()?.saturating_add(1);
            if *count > 32 {
                return Err(H264Error::InvalidData("num_ref_idx_default_active out of range"));
            }
        }

        let weighted_pred_flag = reader.read_flag()?;
        let weighted_bipred_idc = reader.read_bits(2)? as u8;
        reader.skip_golomb(3)?; // pic_init_qp_minus26, pic_init_qs_minus26, chroma_qp_index_offset
        let deblocking_filter_control_present_flag = reader.read_flag()?;
        reader.skip_bits(1)?; // constrained_intra_pred_flag
        let redundant_pic_cnt_present_flag = reader.read_flag()?;

        Ok(Self {
            id: id as u8,
            sps_id: sps_id as u8,
            entropy_coding_mode_flag,
            bottom_field_pic_order_in_frame_present_flag,
            num_slice_groups_minus1,
            slice_group_map_type,
            slice_group_change_rate,
            num_ref_idx,
            weighted_pred_flag,
            weighted_bipred_idc,
            deblocking_filter_control_present_flag,
            redundant_pic_cnt_present_flag,
        })
    }

    /// Whether slice headers end with `slice_group_change_cycle`.
    pub const fn has_slice_group_change_cycle(&self) -> bool {
        self.num_slice_groups_minus1 > 0 && matches!(self.slice_group_map_type, 3..=5)
    }
}

/// `Ceil(Log2(value))`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub(crate) const fn ceil_log2(value: u32) -> u32 {
    if value <= 1 {
        0
    } else {
        u32::BITS - (value - 1).leading_zeros()
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes_util::BitWriter;
    use expgolomb::BitWriterExpGolombExt;

    use super::*;

    #[test]
    fn test_parse_pps_weighted_prediction() {
        let pps = PpsRecord::parse(&[0x68, 0xe9, 0x09, 0x35, 0x20]).unwrap();

        insta::assert_debug_snapshot!(pps, @r"
        PpsRecord {
            id: 0,
            sps_id: 0,
            entropy_coding_mode_flag: true,
            bottom_field_pic_order_in_frame_present_flag: false,
            num_slice_groups_minus1: 0,
            slice_group_map_type: 0,
            slice_group_change_rate: 0,
            num_ref_idx: [
                4,
                4,
            ],
            weighted_pred_flag: true,
            weighted_bipred_idc: 0,
            deblocking_filter_control_present_flag: true,
            redundant_pic_cnt_present_flag: false,
        }
        ");
    }

    #[test]
    fn test_parse_pps_bipred() {
        let pps = PpsRecord::parse(&[0x68, 0xeb, 0xe3, 0xcb, 0x22, 0xc0]).unwrap();

        assert!(pps.entropy_coding_mode_flag);
        assert_eq!(pps.num_ref_idx, [3, 1]);
        assert!(pps.weighted_pred_flag);
        assert_eq!(pps.weighted_bipred_idc, 2);
        assert!(pps.deblocking_filter_control_present_flag);
        assert!(!pps.redundant_pic_cnt_present_flag);
        assert!(!pps.has_slice_group_change_cycle());
    }

    fn pps_with_slice_groups(map_type: u32, groups: impl FnOnce(&mut BitWriter<Vec<u8>>)) -> Vec<u8> {
        let mut w = BitWriter::<Vec<u8>>::default();
        w.write_bits(0x68, 8).unwrap();
        w.write_exp_golomb(9).unwrap(); // pic_parameter_set_id
        w.write_exp_golomb(2).unwrap(); // seq_parameter_set_id
        w.write_bit(false).unwrap();
        w.write_bit(true).unwrap();
        w.write_exp_golomb(2).unwrap(); // num_slice_groups_minus1
        w.write_exp_golomb(map_type as u64).unwrap();
        groups(&mut w);
        w.write_exp_golomb(0).unwrap();
        w.write_exp_golomb(1).unwrap();
        w.write_bit(false).unwrap();
        w.write_bits(1, 2).unwrap();
        w.write_signed_exp_golomb(-3).unwrap();
        w.write_signed_exp_golomb(0).unwrap();
        w.write_signed_exp_golomb(2).unwrap();
        w.write_bit(false).unwrap();
        w.write_bit(true).unwrap();
        w.write_bit(true).unwrap();
        w.write_trailing_bits().unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn test_slice_group_map_types() {
        let explicit_ids = pps_with_slice_groups(6, |w| {
            w.write_exp_golomb(4).unwrap(); // pic_size_in_map_units_minus1
            for id in [0, 1, 2, 1, 0] {
                w.write_bits(id, 2).unwrap();
            }
        });
        let run_lengths = pps_with_slice_groups(0, |w| {
            for run in [10, 0, 7] {
                w.write_exp_golomb(run).unwrap();
            }
        });
        let rectangles = pps_with_slice_groups(2, |w| {
            for corner in [0, 5, 6, 11] {
                w.write_exp_golomb(corner).unwrap();
            }
        });
        let evolving = pps_with_slice_groups(4, |w| {
            w.write_bit(true).unwrap();
            w.write_exp_golomb(19).unwrap();
        });

        for nal in [&explicit_ids, &run_lengths, &rectangles, &evolving] {
            let pps = PpsRecord::parse(nal).unwrap();
            assert_eq!(pps.id, 9);
            assert_eq!(pps.sps_id, 2);
            assert!(pps.bottom_field_pic_order_in_frame_present_flag);
            assert_eq!(pps.num_slice_groups_minus1, 2);
            assert_eq!(pps.num_ref_idx, [1, 2]);
            assert_eq!(pps.weighted_bipred_idc, 1);
            assert!(pps.deblocking_filter_control_present_flag);
            assert!(pps.redundant_pic_cnt_present_flag);
        }

        let pps = PpsRecord::parse(&evolving).unwrap();
        assert_eq!(pps.slice_group_map_type, 4);
        assert_eq!(pps.slice_group_change_rate, 20);
        assert!(pps.has_slice_group_change_cycle());
    }

    #[test]
    fn test_pps_id_out_of_range() {
        let mut w = BitWriter::<Vec<u8>>::default();
        w.write_bits(0x68, 8).unwrap();
        w.write_exp_golomb(256).unwrap();
        w.write_trailing_bits().unwrap();
        let nal = w.finish().unwrap();

        assert!(matches!(
            PpsRecord::parse(&nal),
            Err(H264Error::BadId {
                kind: ParameterSetKind::Pps,
                id: 256
            })
        ));

        let mut w = BitWriter::<Vec<u8>>::default();
        w.write_bits(0x68, 8).unwrap();
        w.write_exp_golomb(0).unwrap();
        w.write_exp_golomb(40).unwrap();
        w.write_trailing_bits().unwrap();
        let nal = w.finish().unwrap();

        assert!(matches!(
            PpsRecord::parse(&nal),
            Err(H264Error::BadId {
                kind: ParameterSetKind::Sps,
                id: 40
            })
        ));
    }

    #[test]
    fn test_ceil_log2() {
        let cases = [(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4)];
        for (value, expected) in cases {
            assert_eq!(ceil_log2(value), expected, "ceil_log2({value})");
        }
    }
}
