use crate::config::ConfigurationError;
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use std::fmt;

/// Shortest shared secret the process accepts at startup.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Supported AES key lengths, longest first.
const KEY_LENGTHS: [usize; 3] = [32, 24, 16];

/// The configured application secret. Immutable for the process lifetime.
#[derive(Clone)]
pub struct SharedSecret(SecretString);

impl SharedSecret {
    /// Validate and wrap a configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingSecret`] for blank input and
    /// [`ConfigurationError::SecretTooShort`] below [`MIN_SECRET_LENGTH`] characters.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigurationError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigurationError::MissingSecret);
        }
        let length = secret.chars().count();
        if length < MIN_SECRET_LENGTH {
            return Err(ConfigurationError::SecretTooShort {
                length,
                minimum: MIN_SECRET_LENGTH,
            });
        }
        Ok(Self(SecretString::from(secret)))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// AES-CBC variant selected by the derived key length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherSuite {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl CipherSuite {
    const fn from_key_length(length: usize) -> Option<Self> {
        match length {
            16 => Some(Self::Aes128Cbc),
            24 => Some(Self::Aes192Cbc),
            32 => Some(Self::Aes256Cbc),
            _ => None,
        }
    }

    #[must_use]
    pub const fn key_length(self) -> usize {
        match self {
            Self::Aes128Cbc => 16,
            Self::Aes192Cbc => 24,
            Self::Aes256Cbc => 32,
        }
    }
}

/// Cipher key sliced from a [`SharedSecret`].
///
/// Non-ASCII characters are dropped first, then the longest supported AES
/// key length that fits is taken from the front of what remains.
pub struct DerivedKey {
    bytes: SecretSlice<u8>,
    suite: CipherSuite,
}

impl DerivedKey {
    /// Derive the cipher key for a secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::SecretTooShort`] when fewer than 16 ASCII
    /// bytes remain after filtering.
    pub fn derive(secret: &SharedSecret) -> Result<Self, ConfigurationError> {
        Self::from_material(secret.expose())
    }

    pub(crate) fn from_material(material: &str) -> Result<Self, ConfigurationError> {
        let ascii: Vec<u8> = material.bytes().filter(u8::is_ascii).collect();
        let length = KEY_LENGTHS
            .iter()
            .copied()
            .find(|&length| ascii.len() >= length)
            .ok_or(ConfigurationError::SecretTooShort {
                length: ascii.len(),
                minimum: MIN_SECRET_LENGTH,
            })?;
        let suite =
            CipherSuite::from_key_length(length).ok_or(ConfigurationError::InvalidKeyLength(length))?;
        let bytes: Vec<u8> = ascii.into_iter().take(length).collect();

        Ok(Self {
            bytes: SecretSlice::from(bytes),
            suite,
        })
    }

    #[must_use]
    pub const fn suite(&self) -> CipherSuite {
        self.suite
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.expose_secret().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}
