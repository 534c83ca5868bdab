//! NAL-aware Common Encryption of H.264 tracks for ISO-BMFF.
//!
//! Encrypts the slice data of every access unit while the NAL framing, the
//! non-VCL units and the slice headers stay readable, and produces the boxes
//! a player needs to decrypt the result.
//!
//! Two schemes are supported:
//!
//! - `cenc`: AES-128-CTR with a 16 byte IV per sample.
//! - `cbcs`: AES-128-CBC over a crypt/skip block pattern with a constant IV.
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use cenc::{EncryptionConfig, Scheme, TrackEncryptor};
//! use h264::NalFormat;
//!
//! let config = EncryptionConfig::builder([0x2b; 16], [0x01; 16])
//!     .scheme(Scheme::Cbcs)
//!     .bitexact(true)
//!     .build();
//!
//! let extradata = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x4d, 0x40, 0x29, 0x96, 0x52, 0x80, 0xf0, 0x04, 0x4f,
//!     0xcb, 0x35, 0x01, 0x01, 0x01, 0x40, 0x00, 0x00, 0xfa, 0x40, 0x00, 0x2e, 0xe0, 0x21,
//!     0x00, 0x00, 0x00, 0x01, 0x68, 0xe9, 0x09, 0x35, 0x20,
//! ];
//! let mut encryptor = TrackEncryptor::new(config, &extradata).unwrap();
//!
//! let sample = [
//!     0x00, 0x00, 0x00, 0x0a, 0x65, 0x88, 0x80, 0x40, 0x02, 0xdb, 0xaa, 0xe2, 0xa9, 0xf5,
//! ];
//! let mut encrypted = Vec::new();
//! let info = encryptor
//!     .encrypt_sample(&sample, NalFormat::LengthPrefixed { length_size: 4 }, &mut encrypted)
//!     .unwrap();
//! assert_eq!(info.clear_bytes(), 10);
//! assert_eq!(info.encrypted_bytes(), 4);
//!
//! let mut moov = Cursor::new(Vec::new());
//! encryptor.write_sinf(&mut moov, *b"avc1").unwrap();
//! encryptor.write_aux_boxes(&mut moov).unwrap();
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod boxes;
pub mod cipher;
pub mod config;
pub mod encryptor;
pub mod error;
pub mod subsample;

pub use boxes::TrackEncryptionBox;
pub use cipher::{CbcsCipher, CtrCipher, SampleCipher, TrackCipher};
pub use config::{EncryptionConfig, EncryptionConfigBuilder, Pattern, Scheme};
pub use encryptor::TrackEncryptor;
pub use error::{CencError, Result};
pub use subsample::{AuxInfoAccumulator, SampleAuxInfo, Subsample, SubsampleBuilder};
