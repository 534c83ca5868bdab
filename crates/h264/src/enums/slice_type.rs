/// `slice_type` as defined by ISO/IEC 14496-10:2022 (Table 7-6).
///
/// Values 5 to 9 mean the same as 0 to 4 with the extra promise that every
/// slice of the picture has that type; they are folded onto the base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceType {
    /// Predicted
    P,
    /// Bi-predicted
    B,
    /// Intra
    I,
    /// Switching P
    SP,
    /// Switching I
    SI,
}

impl SliceType {
    /// Maps a decoded `slice_type` onto its base type (`value % 5`).
    pub const fn from_value(value: u32) -> Self {
        match value % 5 {
            0 => Self::P,
            1 => Self::B,
            2 => Self::I,
            3 => Self::SP,
            _ => Self::SI,
        }
    }

    /// I and SI slices carry no reference picture lists.
    pub const fn is_intra(self) -> bool {
        matches!(self, Self::I | Self::SI)
    }

    /// P, SP and B slices may override `num_ref_idx_active`.
    pub const fn is_inter(self) -> bool {
        !self.is_intra()
    }
}
