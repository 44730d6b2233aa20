//! Decoder for the pre-token session cookie layout:
//! `sign|csrf|expiresMillis-k1:v1&k2:v2`.
//!
//! Only read, never written. `sign` is the lowercase hex SHA-384 of
//! `data + csrf + expiresMillis + secret`.

use crate::token::{SessionClaims, TokenError};
use sha2::{Digest, Sha384};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

pub(crate) const DELIMITER: char = '|';

#[must_use]
pub fn looks_legacy(value: &str) -> bool {
    value.contains(DELIMITER)
}

fn signature(data: &str, csrf: &str, expires: &str, secret: &[u8]) -> String {
    let mut hasher = Sha384::new();
    hasher.update(data.as_bytes());
    hasher.update(csrf.as_bytes());
    hasher.update(expires.as_bytes());
    hasher.update(secret);
    format!("{:x}", hasher.finalize())
}

/// Decode and check a legacy session cookie.
///
/// # Errors
///
/// Returns [`TokenError::Legacy`] for a malformed or badly signed value and
/// [`TokenError::Expired`] once `now_millis` reaches the embedded expiry.
pub fn decode(value: &str, secret: &[u8], now_millis: i64) -> Result<SessionClaims, TokenError> {
    let (prefix, data) = value.split_once('-').ok_or(TokenError::Legacy)?;

    let mut parts = prefix.split(DELIMITER);
    let (Some(sign), Some(csrf), Some(expires), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Legacy);
    };
    if sign.is_empty() || csrf.trim().is_empty() || expires.is_empty() {
        return Err(TokenError::Legacy);
    }

    let expected = signature(data, csrf, expires, secret);
    if !bool::from(sign.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(TokenError::InvalidSignature);
    }

    let expires_millis: i64 = expires.parse().map_err(|_| TokenError::Legacy)?;
    if now_millis >= expires_millis {
        return Err(TokenError::Expired);
    }

    let mut values = BTreeMap::new();
    if !data.is_empty() {
        for entry in data.split('&') {
            let (key, value) = entry.split_once(':').ok_or(TokenError::Legacy)?;
            values.insert(key.to_string(), value.to_string());
        }
    }

    Ok(SessionClaims {
        data: values,
        csrf_token: Some(csrf.to_string()),
        expires: expires_millis / 1000,
    })
}

#[cfg(test)]
pub(crate) fn encode(values: &[(&str, &str)], csrf: &str, expires_millis: i64, secret: &[u8]) -> String {
    let data = values
        .iter()
        .map(|(key, value)| format!("{key}:{value}"))
        .collect::<Vec<_>>()
        .join("&");
    let expires = expires_millis.to_string();
    let sign = signature(&data, csrf, &expires, secret);
    format!("{sign}|{csrf}|{expires}-{data}")
}
