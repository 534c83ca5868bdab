/// NAL (Network Abstraction Layer) unit types as defined by ISO/IEC 14496-10:2022 (Table 7-1).
///
/// The type lives in the low 5 bits of the first byte of every NAL unit, so
/// every `u8` maps onto some variant.
///
/// Types 1 to 5 are VCL units and carry slice data, everything else is
/// metadata that has to stay in the clear when the unit is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NALUnitType {
    /// Regular video slice (non-IDR picture)
    NonIDRSliceLayerWithoutPartitioning,

    /// Coded slice data partition A
    SliceDataPartitionALayer,

    /// Coded slice data partition B
    SliceDataPartitionBLayer,

    /// Coded slice data partition C
    SliceDataPartitionCLayer,

    /// IDR picture (used to refresh the video stream)
    IDRSliceLayerWithoutPartitioning,

    /// Extra metadata (Supplemental Enhancement Information)
    SEI,

    /// Sequence Parameter Set
    SPS,

    /// Picture Parameter Set
    PPS,

    /// Marks the start of a new access unit
    AccessUnitDelimiter,

    /// End of video sequence
    EndOfSeq,

    /// End of video stream
    EndOfStream,

    /// Filler data
    FillerData,

    /// Extension to SPS
    SPSExtension,

    /// Prefix NAL unit (SVC/MVC)
    PrefixNalUnit,

    /// Subset SPS (SVC/MVC)
    SubsetSPS,

    /// Depth parameter set (3D-AVC)
    DepthParameterSet,

    /// Auxiliary coded slice without partitioning
    AuxCodedPictureSliceLayerWithoutPartitioning,

    /// Coded slice extension (MVC)
    SliceLayerExtension,

    /// Coded slice extension for depth views (3D-AVC)
    SliceLayerExtension2,

    /// Reserved values 17, 18, 22 and 23
    Reserved(u8),

    /// Values 0 and 24 to 31, application defined
    Unspecified(u8),
}

impl NALUnitType {
    /// Extracts the unit type from a NAL header byte.
    pub const fn from_header(byte: u8) -> Self {
        match byte & 0x1f {
            1 => Self::NonIDRSliceLayerWithoutPartitioning,
            2 => Self::SliceDataPartitionALayer,
            3 => Self::SliceDataPartitionBLayer,
            4 => Self::SliceDataPartitionCLayer,
            5 => Self::IDRSliceLayerWithoutPartitioning,
            6 => Self::SEI,
            7 => Self::SPS,
            8 => Self::PPS,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSeq,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SPSExtension,
            14 => Self::PrefixNalUnit,
            15 => Self::SubsetSPS,
            16 => Self::DepthParameterSet,
            19 => Self::AuxCodedPictureSliceLayerWithoutPartitioning,
            20 => Self::SliceLayerExtension,
            21 => Self::SliceLayerExtension2,
            value @ (17 | 18 | 22 | 23) => Self::Reserved(value),
            value => Self::Unspecified(value),
        }
    }

    /// The numeric `nal_unit_type`.
    pub const fn value(self) -> u8 {
        match self {
            Self::NonIDRSliceLayerWithoutPartitioning => 1,
            Self::SliceDataPartitionALayer => 2,
            Self::SliceDataPartitionBLayer => 3,
            Self::SliceDataPartitionCLayer => 4,
            Self::IDRSliceLayerWithoutPartitioning => 5,
            Self::SEI => 6,
            Self::SPS => 7,
            Self::PPS => 8,
            Self::AccessUnitDelimiter => 9,
            Self::EndOfSeq => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SPSExtension => 13,
            Self::PrefixNalUnit => 14,
            Self::SubsetSPS => 15,
            Self::DepthParameterSet => 16,
            Self::AuxCodedPictureSliceLayerWithoutPartitioning => 19,
            Self::SliceLayerExtension => 20,
            Self::SliceLayerExtension2 => 21,
            Self::Reserved(value) | Self::Unspecified(value) => value,
        }
    }

    /// Video Coding Layer units (types 1 to 5).
    pub const fn is_vcl(self) -> bool {
        matches!(self.value(), 1..=5)
    }

    /// `IdrPicFlag`
    pub const fn is_idr(self) -> bool {
        matches!(self, Self::IDRSliceLayerWithoutPartitioning)
    }

    /// Slice extensions carrying the 3 byte MVC header extension.
    pub const fn is_slice_extension(self) -> bool {
        matches!(self, Self::SliceLayerExtension | Self::SliceLayerExtension2)
    }
}

impl From<u8> for NALUnitType {
    fn from(byte: u8) -> Self {
        Self::from_header(byte)
    }
}
