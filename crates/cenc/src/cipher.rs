//! AES-128 strategies for the two protection schemes.

use std::io::{self, Write};

use aes::{
    Aes128,
    cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher, generic_array::GenericArray},
};

use crate::config::{KEY_SIZE, Pattern, Scheme};
use crate::error::Result;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of the scratch buffer CTR keystream is applied in.
pub const WORK_BUFFER_SIZE: usize = 4096;

const MAX_CRYPT_GROUP: usize = 10 * BLOCK_SIZE;

/// Encrypts the protected regions of one sample after another.
///
/// Calls come in the order `begin_sample`, any number of `encrypt_region`,
/// `end_sample`. Regions are written to the sink in order and always in full:
/// bytes a scheme leaves clear are copied through unchanged.
pub trait SampleCipher {
    /// Prepares the cipher state for a new sample.
    fn begin_sample(&mut self);

    /// Encrypts `region` and writes the result to `sink`.
    fn encrypt_region<W: Write>(&mut self, region: &[u8], sink: &mut W) -> io::Result<()>;

    /// Finishes the sample. `sample_size` is the full output size of the
    /// sample, clear bytes included.
    fn end_sample(&mut self, sample_size: usize);

    /// IV to store in the auxiliary information of the current sample.
    /// Empty when the scheme uses a constant IV.
    fn sample_iv(&self) -> &[u8];
}

/// AES-128-CTR with one continuous keystream per sample.
pub struct CtrCipher {
    key: [u8; KEY_SIZE],
    iv: [u8; KEY_SIZE],
    stream: Option<Aes128Ctr>,
    buffer: Vec<u8>,
}

impl CtrCipher {
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; KEY_SIZE]) -> Self {
        Self {
            key,
            iv,
            stream: None,
            buffer: vec![0; WORK_BUFFER_SIZE],
        }
    }

    /// Counter block the next sample starts from.
    pub const fn iv(&self) -> &[u8; KEY_SIZE] {
        &self.iv
    }
}

impl SampleCipher for CtrCipher {
    fn begin_sample(&mut self) {
        self.stream = Some(Aes128Ctr::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&self.iv),
        ));
    }

    fn encrypt_region<W: Write>(&mut self, region: &[u8], sink: &mut W) -> io::Result<()> {
        let (key, iv) = (&self.key, &self.iv);
        let stream = self.stream.get_or_insert_with(|| {
            Aes128Ctr::new(GenericArray::from_slice(key), GenericArray::from_slice(iv))
        });

        for chunk in region.chunks(WORK_BUFFER_SIZE) {
            let buffer = &mut self.buffer[..chunk.len()];
            buffer.copy_from_slice(chunk);
            stream.apply_keystream(buffer);
            sink.write_all(buffer)?;
        }

        Ok(())
    }

    fn end_sample(&mut self, sample_size: usize) {
        let blocks = sample_size.div_ceil(BLOCK_SIZE) as u128;
        self.iv = u128::from_be_bytes(self.iv).wrapping_add(blocks).to_be_bytes();
        self.stream = None;
    }

    fn sample_iv(&self) -> &[u8] {
        &self.iv
    }
}

/// AES-128-CBC over a crypt/skip block pattern with a constant IV.
///
/// The chain restarts from the constant IV at every region and runs on
/// across the skipped blocks inside it.
pub struct CbcsCipher {
    aes: Aes128,
    iv: [u8; KEY_SIZE],
    pattern: Pattern,
    buffer: [u8; MAX_CRYPT_GROUP],
}

impl CbcsCipher {
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; KEY_SIZE], pattern: Pattern) -> Result<Self> {
        pattern.validate()?;

        Ok(Self {
            aes: Aes128::new(GenericArray::from_slice(&key)),
            iv,
            pattern,
            buffer: [0; MAX_CRYPT_GROUP],
        })
    }

    /// The IV every region starts from.
    pub const fn constant_iv(&self) -> &[u8; KEY_SIZE] {
        &self.iv
    }

    pub const fn pattern(&self) -> Pattern {
        self.pattern
    }
}

impl SampleCipher for CbcsCipher {
    fn begin_sample(&mut self) {}

    fn encrypt_region<W: Write>(&mut self, region: &[u8], sink: &mut W) -> io::Result<()> {
        let crypt_size = self.pattern.crypt_size();
        let skip_size = self.pattern.skip_size();
        let mut chain = self.iv;
        let mut rest = region;

        loop {
            if crypt_size == 0 || rest.len() < crypt_size {
                if !rest.is_empty() {
                    sink.write_all(rest)?;
                }
                return Ok(());
            }

            let (group, tail) = rest.split_at(crypt_size);
            for (input, output) in group
                .chunks_exact(BLOCK_SIZE)
                .zip(self.buffer.chunks_exact_mut(BLOCK_SIZE))
            {
                for (c, p) in chain.iter_mut().zip(input) {
                    *c ^= p;
                }
                let mut block = GenericArray::clone_from_slice(&chain);
                self.aes.encrypt_block(&mut block);
                chain.copy_from_slice(&block);
                output.copy_from_slice(&chain);
            }
            sink.write_all(&self.buffer[..crypt_size])?;

            let skipped = skip_size.min(tail.len());
            sink.write_all(&tail[..skipped])?;
            rest = &tail[skipped..];
        }
    }

    fn end_sample(&mut self, _sample_size: usize) {}

    fn sample_iv(&self) -> &[u8] {
        &[]
    }
}

/// The cipher of one track, picked from its [`Scheme`].
pub enum TrackCipher {
    Ctr(CtrCipher),
    Cbcs(CbcsCipher),
}

impl TrackCipher {
    pub fn new(
        scheme: Scheme,
        key: [u8; KEY_SIZE],
        iv: [u8; KEY_SIZE],
        pattern: Pattern,
    ) -> Result<Self> {
        Ok(match scheme {
            Scheme::Cenc => Self::Ctr(CtrCipher::new(key, iv)),
            Scheme::Cbcs => Self::Cbcs(CbcsCipher::new(key, iv, pattern)?),
        })
    }

    pub const fn scheme(&self) -> Scheme {
        match self {
            Self::Ctr(_) => Scheme::Cenc,
            Self::Cbcs(_) => Scheme::Cbcs,
        }
    }
}

impl SampleCipher for TrackCipher {
    fn begin_sample(&mut self) {
        match self {
            Self::Ctr(cipher) => cipher.begin_sample(),
            Self::Cbcs(cipher) => cipher.begin_sample(),
        }
    }

    fn encrypt_region<W: Write>(&mut self, region: &[u8], sink: &mut W) -> io::Result<()> {
        match self {
            Self::Ctr(cipher) => cipher.encrypt_region(region, sink),
            Self::Cbcs(cipher) => cipher.encrypt_region(region, sink),
        }
    }

    fn end_sample(&mut self, sample_size: usize) {
        match self {
            Self::Ctr(cipher) => cipher.end_sample(sample_size),
            Self::Cbcs(cipher) => cipher.end_sample(sample_size),
        }
    }

    fn sample_iv(&self) -> &[u8] {
        match self {
            Self::Ctr(cipher) => cipher.sample_iv(),
            Self::Cbcs(cipher) => cipher.sample_iv(),
        }
    }
}
