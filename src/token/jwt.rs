use super::{ClaimSet, TokenError};
use crate::config::ConfigurationError;
use crate::crypto::{SharedSecret, MIN_SECRET_LENGTH};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use std::fmt;

type HmacSha512 = Hmac<Sha512>;

const ALGORITHM: &str = "HS512";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn hs512() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// HMAC key used to sign one kind of cookie token.
pub struct SigningKey(SecretSlice<u8>);

impl SigningKey {
    /// Build a signing key from configured text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::SecretTooShort`] below 16 characters.
    pub fn new(value: &str) -> Result<Self, ConfigurationError> {
        let length = value.chars().count();
        if length < MIN_SECRET_LENGTH {
            return Err(ConfigurationError::SecretTooShort {
                length,
                minimum: MIN_SECRET_LENGTH,
            });
        }
        Ok(Self(SecretSlice::from(value.as_bytes().to_vec())))
    }

    #[must_use]
    pub fn from_secret(secret: &SharedSecret) -> Self {
        Self(SecretSlice::from(secret.expose().as_bytes().to_vec()))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.0.expose_secret()
    }

    fn mac(&self) -> Result<HmacSha512, TokenError> {
        <HmacSha512 as Mac>::new_from_slice(self.expose()).map_err(|_| TokenError::InvalidKey)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies HS512 compact tokens.
///
/// Holds only the issuer name, so a single instance is shared by all requests.
#[derive(Clone, Debug)]
pub struct ClaimsCodec {
    issuer: String,
}

impl ClaimsCodec {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a claim set into `header.payload.signature`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header or claims cannot be encoded.
    pub fn issue(&self, claims: &ClaimSet, key: &SigningKey) -> Result<String, TokenError> {
        let header_b64 = b64e_json(&TokenHeader::hs512())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = key.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the algorithm is not HS512 or the signature does not match,
    /// - `iss` or `aud` differ from what is expected,
    /// - `now_unix_seconds` is past `exp`.
    pub fn verify(
        &self,
        token: &str,
        key: &SigningKey,
        expected_audience: &str,
        now_unix_seconds: i64,
    ) -> Result<ClaimSet, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64).map_err(|err| match err {
            TokenError::Base64 => TokenError::Base64,
            _ => TokenError::InvalidHeader,
        })?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = key.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: ClaimSet = b64d_json(claims_b64)?;
        if claims.iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        if claims.aud != expected_audience {
            return Err(TokenError::InvalidAudience);
        }
        if now_unix_seconds > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
