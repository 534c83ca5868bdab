//! Bit level readers and writers used by the bitstream parsers in this
//! workspace.
//!
//! [`BitReader`] only moves forward and keeps a running count of consumed
//! bits, which is what callers use to measure how much of a header they have
//! parsed. [`BitWriter`] is its mirror image and is mostly used to build test
//! fixtures.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod bit_read;
mod bit_write;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
