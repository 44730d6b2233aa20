use super::key::{CipherSuite, DerivedKey};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64ct::{Base64, Encoding};
use thiserror::Error;
use tracing::warn;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Fixed initialization vector. Identical (key, plaintext) pairs produce
/// identical ciphertext; changing this breaks every cookie already issued.
const IV: [u8; 16] = [0u8; 16];

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid base64 encoding")]
    Base64,
    #[error("invalid padding or block length")]
    Padding,
    #[error("decrypted data is not valid UTF-8")]
    Utf8,
    #[error("invalid key length")]
    KeyLength,
}

/// AES-CBC/PKCS7 engine shared by every request.
///
/// The engine carries no state: each call builds its own cipher instance from
/// the key it is given, so one instance can serve any number of threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct CipherEngine;

impl CipherEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encrypt `plaintext` and return standard base64 ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::KeyLength`] if the key does not match its suite.
    pub fn encrypt(&self, plaintext: &str, key: &DerivedKey) -> Result<String, CipherError> {
        let data = plaintext.as_bytes();
        let key_bytes = key.expose();
        let ciphertext = match key.suite() {
            CipherSuite::Aes128Cbc => Aes128CbcEnc::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(data),
            CipherSuite::Aes192Cbc => Aes192CbcEnc::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(data),
            CipherSuite::Aes256Cbc => Aes256CbcEnc::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .encrypt_padded_vec_mut::<Pkcs7>(data),
        };

        Ok(Base64::encode_string(&ciphertext))
    }

    /// Decrypt base64 ciphertext produced by [`CipherEngine::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error for malformed base64, bad padding, or non UTF-8 output.
    pub fn decrypt(&self, ciphertext: &str, key: &DerivedKey) -> Result<String, CipherError> {
        let data = Base64::decode_vec(ciphertext.trim()).map_err(|_| CipherError::Base64)?;
        let key_bytes = key.expose();
        let plaintext = match key.suite() {
            CipherSuite::Aes128Cbc => Aes128CbcDec::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(&data),
            CipherSuite::Aes192Cbc => Aes192CbcDec::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(&data),
            CipherSuite::Aes256Cbc => Aes256CbcDec::new_from_slices(key_bytes, &IV)
                .map_err(|_| CipherError::KeyLength)?
                .decrypt_padded_vec_mut::<Pkcs7>(&data),
        }
        .map_err(|_| CipherError::Padding)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }

    /// Decrypt and log on failure, for callers that only need "plaintext or nothing".
    #[must_use]
    pub fn decrypt_or_log(&self, ciphertext: &str, key: &DerivedKey) -> Option<String> {
        match self.decrypt(ciphertext, key) {
            Ok(plaintext) => Some(plaintext),
            Err(err) => {
                warn!("Failed to decrypt cookie value: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SharedSecret;
    use std::sync::Arc;

    fn key(secret: &str) -> DerivedKey {
        let derived = SharedSecret::new(secret).and_then(|secret| DerivedKey::derive(&secret));
        match derived {
            Ok(key) => key,
            Err(err) => panic!("failed to derive key: {err}"),
        }
    }

    #[test]
    fn worked_example_round_trips() -> Result<(), CipherError> {
        let engine = CipherEngine::new();
        let key = key("myvoiceismypassword");
        assert_eq!(key.len(), 16);

        let encrypted = engine.encrypt("super secret message!!!", &key)?;
        assert_ne!(encrypted, "super secret message!!!");
        assert!(Base64::decode_vec(&encrypted).is_ok());

        let decrypted = engine.decrypt(&encrypted, &key)?;
        assert_eq!(decrypted, "super secret message!!!");
        Ok(())
    }

    #[test]
    fn round_trips_across_key_sizes() -> Result<(), CipherError> {
        let engine = CipherEngine::new();
        let plaintexts = ["", "a", "exactly sixteen!", "ünïcödé ✓", "x".repeat(1000).as_str()]
            .map(str::to_string);
        for length in [16, 24, 31, 32, 33] {
            let secret: String = "0123456789abcdef".chars().cycle().take(length).collect();
            let key = key(&secret);
            for plaintext in &plaintexts {
                let encrypted = engine.encrypt(plaintext, &key)?;
                assert_eq!(&engine.decrypt(&encrypted, &key)?, plaintext);
            }
        }
        Ok(())
    }

    #[test]
    fn fixed_iv_is_deterministic() -> Result<(), CipherError> {
        let engine = CipherEngine::new();
        let key = key("myvoiceismypassword");
        assert_eq!(
            engine.encrypt("same input", &key)?,
            engine.encrypt("same input", &key)?
        );
        Ok(())
    }

    #[test]
    fn malformed_input_fails_without_panicking() {
        let engine = CipherEngine::new();
        let key = key("myvoiceismypassword");

        assert!(matches!(
            engine.decrypt("not base64 at all!", &key),
            Err(CipherError::Base64)
        ));
        // Valid base64, but not a whole number of blocks.
        assert!(matches!(
            engine.decrypt(&Base64::encode_string(b"short"), &key),
            Err(CipherError::Padding)
        ));
        assert!(engine.decrypt_or_log("%%%", &key).is_none());
    }

    #[test]
    fn wrong_key_does_not_yield_plaintext() -> Result<(), CipherError> {
        let engine = CipherEngine::new();
        let encrypted = engine.encrypt("super secret message!!!", &key("myvoiceismypassword"))?;
        let other = engine.decrypt(&encrypted, &key("another-secret-value"));
        assert!(other.map_or(true, |plaintext| plaintext != "super secret message!!!"));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_calls_do_not_interfere() {
        let engine = Arc::new(CipherEngine::new());
        let key = Arc::new(key("a-shared-secret-of-32-characters"));

        let mut handles = Vec::with_capacity(100);
        for index in 0..100 {
            let engine = Arc::clone(&engine);
            let key = Arc::clone(&key);
            handles.push(tokio::task::spawn_blocking(move || {
                let plaintext = format!("payload number {index} {}", "#".repeat(index));
                let decrypted = engine
                    .encrypt(&plaintext, &key)
                    .and_then(|encrypted| engine.decrypt(&encrypted, &key));
                (plaintext, decrypted.ok())
            }));
        }

        for handle in handles {
            let joined = handle.await;
            assert!(joined.is_ok(), "task panicked");
            if let Ok((plaintext, decrypted)) = joined {
                assert_eq!(decrypted.as_deref(), Some(plaintext.as_str()));
            }
        }
    }
}
