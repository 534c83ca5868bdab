//! Exponential-Golomb coding on top of the [`BitReader`] and [`BitWriter`]
//! from the [`bytes-util`](bytes_util) crate.
//!
//! H.264 parameter sets and slice headers encode most of their syntax
//! elements as `ue(v)` (unsigned) or `se(v)` (signed) Exp-Golomb codes.
//!
//! ```rust
//! # fn test() -> std::io::Result<()> {
//! use expgolomb::{BitReaderExpGolombExt, BitWriterExpGolombExt};
//! use bytes_util::{BitReader, BitWriter};
//!
//! let mut bit_writer = BitWriter::default();
//! bit_writer.write_exp_golomb(7)?;
//! bit_writer.write_signed_exp_golomb(-2)?;
//!
//! let data: Vec<u8> = bit_writer.finish()?;
//!
//! let mut bit_reader = BitReader::new_from_slice(data);
//! assert_eq!(bit_reader.read_exp_golomb()?, 7);
//! assert_eq!(bit_reader.read_signed_exp_golomb()?, -2);
//! # Ok(())
//! # }
//! # test().expect("failed to run test");
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::io;

use bytes_util::{BitReader, BitWriter};

/// Longest prefix of zero bits that still yields a value representable in a `u64`.
const MAX_LEADING_ZEROS: u32 = 63;

/// Extension trait for reading Exp-Golomb encoded numbers from a bit reader
///
/// See: <https://en.wikipedia.org/wiki/Exponential-Golomb_coding>
pub trait BitReaderExpGolombExt {
    /// Reads an unsigned Exp-Golomb code.
    ///
    /// A prefix of more than 63 zero bits is rejected with
    /// [`io::ErrorKind::InvalidData`].
    fn read_exp_golomb(&mut self) -> io::Result<u64>;

    /// Reads a signed Exp-Golomb code (`1 → 1`, `2 → -1`, `3 → 2`, ...)
    fn read_signed_exp_golomb(&mut self) -> io::Result<i64> {
        let code = self.read_exp_golomb()?;

        if code % 2 == 0 {
            Ok(-((code / 2) as i64))
        } else {
            Ok((code / 2) as i64 + 1)
        }
    }
}

impl<R: io::Read> BitReaderExpGolombExt for BitReader<R> {
    fn read_exp_golomb(&mut self) -> io::Result<u64> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > MAX_LEADING_ZEROS {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "exp-golomb prefix longer than 63 bits",
                ));
            }
        }

        let mut result = 1u64;
        for _ in 0..leading_zeros {
            result = (result << 1) | self.read_bit()? as u64;
        }

        Ok(result - 1)
    }
}

/// Extension trait for writing Exp-Golomb encoded numbers to a bit writer
///
/// See: <https://en.wikipedia.org/wiki/Exponential-Golomb_coding>
pub trait BitWriterExpGolombExt {
    /// Writes an unsigned Exp-Golomb code. `u64::MAX` cannot be represented.
    fn write_exp_golomb(&mut self, input: u64) -> io::Result<()>;

    /// Writes a signed Exp-Golomb code
    fn write_signed_exp_golomb(&mut self, number: i64) -> io::Result<()> {
        let code = if number <= 0 {
            number.unsigned_abs() * 2
        } else {
            number as u64 * 2 - 1
        };

        self.write_exp_golomb(code)
    }
}

impl<W: io::Write> BitWriterExpGolombExt for BitWriter<W> {
    fn write_exp_golomb(&mut self, input: u64) -> io::Result<()> {
        let value = input.checked_add(1).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "u64::MAX has no exp-golomb code")
        })?;
        let leading_zeros = (63 - value.leading_zeros()) as u8;

        self.write_bits(0, leading_zeros)?;
        self.write_bits(value, leading_zeros + 1)
    }
}

/// Returns the number of bits an unsigned Exp-Golomb code of `number` takes up.
pub fn size_of_exp_golomb(number: u64) -> u64 {
    let value = number.saturating_add(1);
    (63 - value.leading_zeros() as u64) * 2 + 1
}
