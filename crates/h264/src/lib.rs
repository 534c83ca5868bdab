//! A pure Rust implementation of the parts of H.264 needed to encrypt it.
//!
//! This crate reads just enough of an H.264 elementary stream to tell, for
//! every NAL unit, which bytes a Common Encryption packager must leave in the
//! clear: the NAL framing, the NAL header and the slice header.
//!
//! ## What is in here?
//!
//! - [`NalScanner`] splits an access unit into NAL units, either Annex-B
//!   (start code delimited) or length prefixed as in MP4 samples.
//! - [`ParameterSetStore`] keeps the SPS and PPS of one stream, built from
//!   Annex-B extradata or an [`AVCDecoderConfigurationRecord`].
//! - [`slice_header_size`] walks a slice header against the store and returns
//!   its length in escaped bytes.
//!
//! Only the syntax elements that influence the slice header layout are kept.
//! Everything else is skipped.
//!
//! ## Examples
//!
//! ```rust
//! use h264::{NalFormat, NalScanner, ParameterSetStore, ZeroPadding, slice_header_size};
//!
//! let extradata = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x4d, 0x40, 0x29, 0x96, 0x52, 0x80, 0xf0, 0x04, 0x4f,
//!     0xcb, 0x35, 0x01, 0x01, 0x01, 0x40, 0x00, 0x00, 0xfa, 0x40, 0x00, 0x2e, 0xe0, 0x21,
//!     0x00, 0x00, 0x00, 0x01, 0x68, 0xe9, 0x09, 0x35, 0x20,
//! ];
//! let store = ParameterSetStore::from_extradata(&extradata).unwrap();
//!
//! let sample = [
//!     0x00, 0x00, 0x00, 0x0a, 0x65, 0x88, 0x80, 0x40, 0x02, 0xdb, 0xaa, 0xe2, 0xa9, 0xf5,
//! ];
//! for unit in NalScanner::new(&sample, NalFormat::LengthPrefixed { length_size: 4 }) {
//!     let unit = unit.unwrap();
//!     if unit.is_vcl() {
//!         assert_eq!(slice_header_size(&store, unit.payload).unwrap(), 6);
//!     }
//! }
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod bitstream;
mod config;
mod enums;
mod error;
mod io;
mod nal;
mod pps;
mod slice_header;
mod sps;
mod store;

pub use bitstream::RbspReader;
pub use config::AVCDecoderConfigurationRecord;
pub use enums::*;
pub use error::{H264Error, ParameterSetKind, Result};
pub use io::EmulationPreventionIo;
pub use nal::{NalFormat, NalScanner, NalUnit, ZeroPadding, starts_with_start_code};
pub use pps::{MAX_PPS_COUNT, PpsRecord};
pub use slice_header::slice_header_size;
pub use sps::{MAX_SPS_COUNT, SpsRecord};
pub use store::ParameterSetStore;
