use std::io;

use thiserror::Error;

/// Which kind of parameter set an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSetKind {
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
}

impl std::fmt::Display for ParameterSetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sps => f.write_str("SPS"),
            Self::Pps => f.write_str("PPS"),
        }
    }
}

/// Errors produced while parsing H.264 parameter sets, slice headers and NAL framing.
#[derive(Error, Debug)]
pub enum H264Error {
    /// The input has no bytes to parse at all.
    #[error("Input buffer is empty")]
    TooShort,
    /// The bitstream ended in the middle of a syntax element.
    #[error("Bitstream exhausted before the syntax element was complete")]
    BufferExhausted,
    /// A parameter set id outside of the allowed range.
    #[error("{kind} id {id} is out of range")]
    BadId {
        /// Kind of parameter set
        kind: ParameterSetKind,
        /// The offending id
        id: u32,
    },
    /// A PPS referenced an unknown SPS or a slice referenced an unknown PPS.
    #[error("{kind} {id} is not present in the parameter set store")]
    MissingParameterSet {
        /// Kind of parameter set
        kind: ParameterSetKind,
        /// The missing id
        id: u32,
    },
    /// A NAL length field claims more data than is available.
    #[error("NAL unit truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the framing asked for
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },
    /// A syntax element has a value the parser cannot work with.
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),
    /// Any other I/O failure from the underlying reader.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for H264Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::BufferExhausted,
            io::ErrorKind::InvalidData => Self::InvalidData("malformed exp-golomb code"),
            _ => Self::Io(err),
        }
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, H264Error>;
