use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{CencError, Result};

/// Size of AES-128 keys, KIDs and IVs in bytes.
pub const KEY_SIZE: usize = 16;

/// Number of 16 byte blocks in one cbcs pattern cycle.
pub const PATTERN_BLOCKS: u8 = 10;

/// Common Encryption protection scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// AES-128-CTR over every protected byte, a fresh IV per sample.
    #[default]
    Cenc,
    /// AES-128-CBC with a 1:9 style block pattern and one constant IV.
    Cbcs,
}

impl Scheme {
    /// `scheme_type` as written in `schm`.
    pub const fn fourcc(self) -> [u8; 4] {
        match self {
            Self::Cenc => *b"cenc",
            Self::Cbcs => *b"cbcs",
        }
    }

    /// `default_Per_Sample_IV_Size` in `tenc`. cbcs uses a constant IV instead.
    pub const fn per_sample_iv_size(self) -> u8 {
        match self {
            Self::Cenc => KEY_SIZE as u8,
            Self::Cbcs => 0,
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cenc => f.write_str("cenc"),
            Self::Cbcs => f.write_str("cbcs"),
        }
    }
}

/// cbcs encryption pattern: `crypt_byte_block` encrypted 16 byte blocks
/// followed by `skip_byte_block` clear ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub crypt_byte_block: u8,
    pub skip_byte_block: u8,
}

impl Pattern {
    /// Creates a pattern, which must cover exactly 10 blocks.
    pub fn new(crypt_byte_block: u8, skip_byte_block: u8) -> Result<Self> {
        let pattern = Self {
            crypt_byte_block,
            skip_byte_block,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> Result<()> {
        if self.crypt_byte_block as u16 + self.skip_byte_block as u16 != PATTERN_BLOCKS as u16 {
            return Err(CencError::InvalidPattern {
                crypt: self.crypt_byte_block,
                skip: self.skip_byte_block,
            });
        }
        Ok(())
    }

    /// The `tenc` pattern byte.
    pub const fn as_byte(&self) -> u8 {
        (self.crypt_byte_block << 4) | (self.skip_byte_block & 0x0f)
    }

    pub(crate) const fn crypt_size(&self) -> usize {
        self.crypt_byte_block as usize * 16
    }

    pub(crate) const fn skip_size(&self) -> usize {
        self.skip_byte_block as usize * 16
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            crypt_byte_block: 1,
            skip_byte_block: 9,
        }
    }
}

/// Encryption settings of one track.
///
/// Keys and IVs are hex strings when deserialized. `key` and `kid` are
/// required, everything else has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Protection scheme
    #[serde(default)]
    pub scheme: Scheme,

    /// AES-128 content key
    #[serde(with = "hex")]
    pub key: [u8; KEY_SIZE],

    /// Key ID written to `tenc`
    #[serde(with = "hex")]
    pub kid: [u8; KEY_SIZE],

    /// Initial IV for cenc, constant IV for cbcs. Random when absent.
    #[serde(default, with = "optional_hex")]
    pub iv: Option<[u8; KEY_SIZE]>,

    /// Use an all-zero IV instead of a random one, for reproducible output
    #[serde(default)]
    pub bitexact: bool,

    /// cbcs block pattern, ignored for cenc
    #[serde(default)]
    pub pattern: Pattern,

    /// Leave NAL framing and slice headers in the clear and describe the
    /// split with subsample entries. When disabled every sample is encrypted
    /// as a whole.
    #[serde(default = "default_use_subsamples")]
    pub use_subsamples: bool,
}

const fn default_use_subsamples() -> bool {
    true
}

impl Display for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let iv_display = match (self.iv, self.bitexact) {
            (Some(iv), _) => hex::encode(iv),
            (None, true) => "zero".to_string(),
            (None, false) => "random".to_string(),
        };

        write!(
            f,
            "EncryptionConfig {{ scheme: {}, kid: {}, iv: {}, pattern: {}:{}, subsamples: {} }}",
            self.scheme,
            hex::encode(self.kid),
            iv_display,
            self.pattern.crypt_byte_block,
            self.pattern.skip_byte_block,
            self.use_subsamples
        )
    }
}

impl EncryptionConfig {
    /// Creates a config for `key` and `kid` with every other setting at its
    /// default.
    pub fn new(scheme: Scheme, key: [u8; KEY_SIZE], kid: [u8; KEY_SIZE]) -> Self {
        Self {
            scheme,
            key,
            kid,
            iv: None,
            bitexact: false,
            pattern: Pattern::default(),
            use_subsamples: default_use_subsamples(),
        }
    }

    pub fn builder(key: [u8; KEY_SIZE], kid: [u8; KEY_SIZE]) -> EncryptionConfigBuilder {
        EncryptionConfigBuilder {
            config: Self::new(Scheme::default(), key, kid),
        }
    }

    /// Creates a config from hex encoded key and key ID, everything else default.
    pub fn from_hex(scheme: Scheme, key: &str, kid: &str) -> Result<Self> {
        Ok(Self::new(scheme, decode_key(key)?, decode_key(kid)?))
    }

    /// Checks the settings that cannot be enforced by the types alone.
    pub fn validate(&self) -> Result<()> {
        if self.scheme == Scheme::Cbcs {
            self.pattern.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EncryptionConfigBuilder {
    config: EncryptionConfig,
}

impl EncryptionConfigBuilder {
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.config.scheme = scheme;
        self
    }

    pub fn iv(mut self, iv: [u8; KEY_SIZE]) -> Self {
        self.config.iv = Some(iv);
        self
    }

    pub fn bitexact(mut self, bitexact: bool) -> Self {
        self.config.bitexact = bitexact;
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.config.pattern = pattern;
        self
    }

    pub fn use_subsamples(mut self, use_subsamples: bool) -> Self {
        self.config.use_subsamples = use_subsamples;
        self
    }

    pub fn build(self) -> EncryptionConfig {
        self.config
    }
}

fn decode_key(value: &str) -> Result<[u8; KEY_SIZE]> {
    let bytes = hex::decode(value)?;
    bytes.try_into().map_err(|_| CencError::InvalidKey)
}

mod optional_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::KEY_SIZE;

    pub fn serialize<S: Serializer>(
        value: &Option<[u8; KEY_SIZE]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(iv) => serializer.serialize_some(&hex::encode(iv)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; KEY_SIZE]>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|value| {
                let mut iv = [0; KEY_SIZE];
                hex::decode_to_slice(&value, &mut iv).map_err(serde::de::Error::custom)?;
                Ok(iv)
            })
            .transpose()
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_must_cover_ten_blocks() {
        assert_eq!(Pattern::new(1, 9).unwrap(), Pattern::default());
        assert_eq!(Pattern::new(10, 0).unwrap().as_byte(), 0xa0);
        assert_eq!(Pattern::new(0, 10).unwrap().as_byte(), 0x0a);
        assert_eq!(Pattern::new(2, 8).unwrap().as_byte(), 0x28);

        for (crypt, skip) in [(1, 8), (5, 6), (0, 0), (255, 11)] {
            assert!(matches!(
                Pattern::new(crypt, skip),
                Err(CencError::InvalidPattern { crypt: c, skip: s }) if c == crypt && s == skip
            ));
        }
    }

    #[test]
    fn test_validate_checks_pattern_for_cbcs_only() {
        let pattern = Pattern {
            crypt_byte_block: 3,
            skip_byte_block: 3,
        };

        let cenc = EncryptionConfig::builder([0x2b; KEY_SIZE], [0x01; KEY_SIZE])
            .pattern(pattern)
            .build();
        assert!(cenc.validate().is_ok());

        let cbcs = EncryptionConfig::builder([0x2b; KEY_SIZE], [0x01; KEY_SIZE])
            .scheme(Scheme::Cbcs)
            .pattern(pattern)
            .build();
        assert!(matches!(
            cbcs.validate(),
            Err(CencError::InvalidPattern { crypt: 3, skip: 3 })
        ));
    }

    #[test]
    fn test_from_hex() {
        let config = EncryptionConfig::from_hex(
            Scheme::Cbcs,
            "2b7e151628aed2a6abf7158809cf4f3c",
            "00112233445566778899aabbccddeeff",
        )
        .unwrap();

        assert_eq!(config.key[0], 0x2b);
        assert_eq!(config.kid[15], 0xff);
        assert!(config.use_subsamples);
        assert_eq!(config.iv, None);

        assert!(matches!(
            EncryptionConfig::from_hex(Scheme::Cenc, "2b7e", "00112233445566778899aabbccddeeff"),
            Err(CencError::InvalidKey)
        ));
        assert!(matches!(
            EncryptionConfig::from_hex(Scheme::Cenc, "zz", "00"),
            Err(CencError::Hex(_))
        ));
    }

    #[test]
    fn test_deserialize() {
        let config: EncryptionConfig = serde_json::from_str(
            r#"{
                "scheme": "cbcs",
                "key": "2b7e151628aed2a6abf7158809cf4f3c",
                "kid": "00112233445566778899aabbccddeeff",
                "iv": "000102030405060708090a0b0c0d0e0f",
                "pattern": { "crypt_byte_block": 2, "skip_byte_block": 8 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.scheme, Scheme::Cbcs);
        assert_eq!(config.iv.unwrap()[15], 0x0f);
        assert_eq!(config.pattern, Pattern::new(2, 8).unwrap());
        assert!(config.use_subsamples);
        assert!(!config.bitexact);

        let round_trip: EncryptionConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_deserialize_requires_key() {
        let missing_key = serde_json::from_str::<EncryptionConfig>(
            r#"{ "scheme": "cenc", "kid": "00112233445566778899aabbccddeeff" }"#,
        );
        assert!(missing_key.unwrap_err().to_string().contains("missing field `key`"));

        let missing_kid = serde_json::from_str::<EncryptionConfig>(
            r#"{ "key": "2b7e151628aed2a6abf7158809cf4f3c" }"#,
        );
        assert!(missing_kid.unwrap_err().to_string().contains("missing field `kid`"));

        let minimal: EncryptionConfig = serde_json::from_str(
            r#"{
                "key": "2b7e151628aed2a6abf7158809cf4f3c",
                "kid": "00112233445566778899aabbccddeeff"
            }"#,
        )
        .unwrap();
        assert_eq!(
            minimal,
            EncryptionConfig::from_hex(
                Scheme::Cenc,
                "2b7e151628aed2a6abf7158809cf4f3c",
                "00112233445566778899aabbccddeeff"
            )
            .unwrap()
        );
    }

    #[test]
    fn test_display() {
        let config = EncryptionConfig::builder([0x2b; KEY_SIZE], [0xab; KEY_SIZE])
            .bitexact(true)
            .build();

        insta::assert_snapshot!(config.to_string(), @"EncryptionConfig { scheme: cenc, kid: abababababababababababababababab, iv: zero, pattern: 1:9, subsamples: true }");
    }
}
