//! Measures the part of a slice NAL unit that has to stay in the clear.

use tracing::trace;

use crate::bitstream::RbspReader;
use crate::enums::{NALUnitType, SliceType};
use crate::error::{H264Error, Result};
use crate::pps::PpsRecord;
use crate::sps::SpsRecord;
use crate::store::ParameterSetStore;

/// `modification_of_pic_nums_idc` value that ends a reference list modification.
const END_OF_REF_PIC_LIST_MODIFICATION: u32 = 3;

/// `memory_management_control_operation` value that ends the MMCO list.
const END_OF_MEMORY_MANAGEMENT: u32 = 0;

/// Returns the number of bytes at the start of a VCL NAL unit covered by the
/// NAL header and the slice header.
///
/// A slice header that ends inside a byte claims that whole byte. The count is
/// taken on the escaped unit, so emulation prevention bytes before the end of
/// the header are included. The result never exceeds `nal.len()`, and nothing
/// past the returned boundary is looked at.
///
/// Every VCL type is read as a slice header, data partitions B and C (types 3
/// and 4) included, even though those start with `slice_id` instead. Their
/// leading fields are then taken as `first_mb_in_slice`, `slice_type` and
/// `pic_parameter_set_id`, so such a unit can fail with
/// [`H264Error::MissingParameterSet`] and abort the sample it belongs to.
pub fn slice_header_size(store: &ParameterSetStore, nal: &[u8]) -> Result<usize> {
    let mut reader = RbspReader::new(nal)?;

    reader.skip_bits(1)?; // forbidden_zero_bit
    let nal_ref_idc = reader.read_bits(2)?;
    let nal_unit_type = NALUnitType::from(reader.read_bits(5)? as u8);
    let mvc = nal_unit_type.is_slice_extension();

    let idr = if mvc {
        let svc_extension_flag = reader.read_flag()?;
        // idr_flag for SVC, non_idr_flag for MVC
        let flag = reader.read_flag()?;
        reader.skip_bits(22)?;
        if svc_extension_flag { flag } else { !flag }
    } else {
        nal_unit_type.is_idr()
    };

    reader.skip_golomb(1)?; // first_mb_in_slice
    let slice_type = SliceType::from_value(reader.read_ue()?);
    let (pps, sps) = store.resolve(reader.read_ue()?)?;

    if sps.separate_colour_plane_flag {
        reader.skip_bits(2)?; // colour_plane_id
    }
    reader.skip_bits(sps.log2_max_frame_num as u32)?; // frame_num

    let mut field_pic_flag = false;
    if !sps.frame_mbs_only_flag {
        field_pic_flag = reader.read_flag()?;
        if field_pic_flag {
            reader.skip_bits(1)?; // bottom_field_flag
        }
    }

    if idr {
        reader.skip_golomb(1)?; // idr_pic_id
    }

    let delta_bottom = pps.bottom_field_pic_order_in_frame_present_flag && !field_pic_flag;
    match sps.pic_order_cnt_type {
        0 => {
            reader.skip_bits(sps.log2_max_pic_order_cnt_lsb as u32)?; // pic_order_cnt_lsb
            if delta_bottom {
                reader.skip_golomb(1)?; // delta_pic_order_cnt_bottom
            }
        }
        1 if !sps.delta_pic_order_always_zero_flag => {
            reader.skip_golomb(1)?; // delta_pic_order_cnt[0]
            if delta_bottom {
                reader.skip_golomb(1)?; // delta_pic_order_cnt[1]
            }
        }
        _ => {}
    }

    if pps.redundant_pic_cnt_present_flag {
        reader.skip_golomb(1)?; // redundant_pic_cnt
    }

    if slice_type == SliceType::B {
        reader.skip_bits(1)?; // direct_spatial_mv_pred_flag
    }

    let mut num_ref_idx = pps.num_ref_idx;
    if slice_type.is_inter() && reader.read_flag()? {
        num_ref_idx[0] = reader.read_ue()?.saturating_add(1);
        if slice_type == SliceType::B {
            num_ref_idx[1] = reader.read_ue()?.saturating_add(1);
        }
    }
    if num_ref_idx.iter().any(|count| *count > 32) {
        return Err(H264Error::InvalidData("num_ref_idx_active out of range"));
    }

    skip_ref_pic_list_modification(&mut reader, slice_type, mvc)?;

    let weighted = match slice_type {
        SliceType::P | SliceType::SP => pps.weighted_pred_flag,
        SliceType::B => pps.weighted_bipred_idc == 1,
        _ => false,
    };
    if weighted {
        skip_pred_weight_table(&mut reader, slice_type, num_ref_idx, sps.chroma_array_type)?;
    }

    if nal_ref_idc != 0 {
        skip_dec_ref_pic_marking(&mut reader, idr)?;
    }

    if pps.entropy_coding_mode_flag && !slice_type.is_intra() {
        reader.skip_golomb(1)?; // cabac_init_idc
    }

    reader.skip_golomb(1)?; // slice_qp_delta
    if matches!(slice_type, SliceType::SP | SliceType::SI) {
        if slice_type == SliceType::SP {
            reader.skip_bits(1)?; // sp_for_switch_flag
        }
        reader.skip_golomb(1)?; // slice_qs_delta
    }

    if pps.deblocking_filter_control_present_flag {
        let disable_deblocking_filter_idc = reader.read_ue()?;
        if disable_deblocking_filter_idc != 1 {
            reader.skip_golomb(2)?; // slice_alpha_c0_offset_div2, slice_beta_offset_div2
        }
    }

    if pps.has_slice_group_change_cycle() {
        reader.skip_bits(slice_group_change_cycle_bits(sps, pps))?;
    }

    let size = reader.raw_bytes_consumed();
    trace!(
        "{nal_unit_type:?} {slice_type:?} slice header: {} bits, {size} bytes in the clear",
        reader.bits_consumed()
    );
    Ok(size)
}

/// Width of `slice_group_change_cycle`:
/// `Ceil(Log2(PicSizeInMapUnits ÷ SliceGroupChangeRate + 1))` with an exact
/// division, i.e. the smallest `n` with `rate * 2^n >= size + rate`.
fn slice_group_change_cycle_bits(sps: &SpsRecord, pps: &PpsRecord) -> u32 {
    let rate = pps.slice_group_change_rate.max(1) as u64;
    let target = sps.pic_size_in_map_units() + rate;

    let mut bits = 0;
    while bits < 64 && rate << bits < target {
        bits += 1;
    }
    bits
}

/// `ref_pic_list_modification()` and `ref_pic_list_mvc_modification()`.
fn skip_ref_pic_list_modification(
    reader: &mut RbspReader<'_>,
    slice_type: SliceType,
    mvc: bool,
) -> Result<u64> {
    let start = reader.bits_consumed();

    let lists = match slice_type {
        SliceType::B => 2,
        SliceType::P | SliceType::SP => 1,
        SliceType::I | SliceType::SI => 0,
    };

    for _ in 0..lists {
        if !reader.read_flag()? {
            continue;
        }

        loop {
            match reader.read_ue()? {
                END_OF_REF_PIC_LIST_MODIFICATION => break,
                // abs_diff_pic_num_minus1, long_term_pic_num
                0..=2 => reader.skip_golomb(1)?,
                // abs_diff_view_idx_minus1
                4 | 5 if mvc => reader.skip_golomb(1)?,
                _ => return Err(H264Error::InvalidData("modification_of_pic_nums_idc out of range")),
            }
        }
    }

    Ok(reader.bits_consumed() - start)
}

/// `pred_weight_table()`
fn skip_pred_weight_table(
    reader: &mut RbspReader<'_>,
    slice_type: SliceType,
    num_ref_idx: [u32; 2],
    chroma_array_type: u8,
) -> Result<u64> {
    let start = reader.bits_consumed();
    let chroma = chroma_array_type != 0;

    reader.skip_golomb(1)?; // luma_log2_weight_denom
    if chroma {
        reader.skip_golomb(1)?; // chroma_log2_weight_denom
    }

    let lists = if slice_type == SliceType::B { 2 } else { 1 };
    for count in &num_ref_idx[..lists] {
        for _ in 0..*count {
            if reader.read_flag()? {
                reader.skip_golomb(2)?; // luma_weight, luma_offset
            }
            if chroma && reader.read_flag()? {
                reader.skip_golomb(4)?; // chroma_weight, chroma_offset for Cb and Cr
            }
        }
    }

    Ok(reader.bits_consumed() - start)
}

/// `dec_ref_pic_marking()`
fn skip_dec_ref_pic_marking(reader: &mut RbspReader<'_>, idr: bool) -> Result<u64> {
    let start = reader.bits_consumed();

    if idr {
        reader.skip_bits(2)?; // no_output_of_prior_pics_flag, long_term_reference_flag
        return Ok(reader.bits_consumed() - start);
    }

    // adaptive_ref_pic_marking_mode_flag
    if reader.read_flag()? {
        loop {
            match reader.read_ue()? {
                END_OF_MEMORY_MANAGEMENT => break,
                // difference_of_pic_nums_minus1, long_term_pic_num, max_long_term_frame_idx_plus1
                1 | 2 | 4 => reader.skip_golomb(1)?,
                // difference_of_pic_nums_minus1, long_term_frame_idx
                3 => reader.skip_golomb(2)?,
                // long_term_frame_idx
                6 => reader.skip_golomb(1)?,
                5 => {}
                _ => {
                    return Err(H264Error::InvalidData(
                        "memory_management_control_operation out of range",
                    ));
                }
            }
        }
    }

    Ok(reader.bits_consumed() - start)
}
