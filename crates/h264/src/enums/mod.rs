mod nal_unit_type;
mod slice_type;

pub use nal_unit_type::NALUnitType;
pub use slice_type::SliceType;
