use std::collections::TryReserveError;
use std::io;

use h264::H264Error;
use thiserror::Error;

/// Errors that can occur while encrypting a track
#[derive(Error, Debug)]
pub enum CencError {
    #[error("Invalid cbcs pattern {crypt}:{skip}, crypt and skip blocks must add up to 10")]
    InvalidPattern { crypt: u8, skip: u8 },

    #[error("Keys, KIDs and IVs must be exactly 16 bytes")]
    InvalidKey,

    #[error("Failed to grow the auxiliary information buffer")]
    AllocationFailure,

    #[error("Auxiliary information entry of {0} bytes does not fit in a saiz size table")]
    AuxInfoTooLarge(usize),

    #[error("Sample region of {0} bytes is too large for a subsample entry")]
    SampleTooLarge(usize),

    #[error("H.264 error: {0}")]
    H264(#[from] H264Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid hex string: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl From<TryReserveError> for CencError {
    fn from(_: TryReserveError) -> Self {
        Self::AllocationFailure
    }
}

pub type Result<T> = std::result::Result<T, CencError>;
