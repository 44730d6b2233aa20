//! Cookie value composition and parsing.
//!
//! A cookie value is a signed token, optionally encrypted. Parsing never
//! fails loudly: anything that does not verify collapses to `None` after a
//! single warning.

pub mod legacy;
mod outbound;

pub use outbound::OutboundCookie;

use crate::crypto::{CipherEngine, DerivedKey};
use crate::error::Result;
use crate::token::{ClaimSet, ClaimsCodec, SigningKey, TokenError};
use axum::http::{header::COOKIE, HeaderMap};
use tracing::{debug, warn};

const TOKEN_SEPARATOR: char = '.';

/// Value of the cookie called `name` in the request's `Cookie` headers.
#[must_use]
pub fn find<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// Signs, encrypts and reverses both for cookie values.
#[derive(Debug)]
pub struct CookieCodec {
    cipher: CipherEngine,
    claims: ClaimsCodec,
    key: DerivedKey,
}

impl CookieCodec {
    #[must_use]
    pub fn new(claims: ClaimsCodec, key: DerivedKey) -> Self {
        Self {
            cipher: CipherEngine::new(),
            claims,
            key,
        }
    }

    /// Sign `claims`, then encrypt the token when `encrypt` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or encryption fails.
    pub fn compose(&self, claims: &ClaimSet, signing_key: &SigningKey, encrypt: bool) -> Result<String> {
        let token = self.claims.issue(claims, signing_key)?;
        if encrypt {
            Ok(self.cipher.encrypt(&token, &self.key)?)
        } else {
            Ok(token)
        }
    }

    /// Reverse [`CookieCodec::compose`] for a cookie named `audience`.
    ///
    /// With `encrypt` set, a value that already has the shape of a plain
    /// token is still accepted so cookies issued before encryption was
    /// enabled keep working.
    #[must_use]
    pub fn parse(
        &self,
        value: &str,
        signing_key: &SigningKey,
        encrypt: bool,
        audience: &str,
        now: i64,
    ) -> Option<ClaimSet> {
        let plain = self.plaintext(value, encrypt)?;
        self.verify(&plain, signing_key, audience, now)
    }

    /// Like [`CookieCodec::parse`], but also accepts the legacy session layout.
    #[must_use]
    pub fn parse_session(
        &self,
        value: &str,
        signing_key: &SigningKey,
        encrypt: bool,
        audience: &str,
        now: i64,
    ) -> Option<ClaimSet> {
        let plain = self.plaintext(value, encrypt)?;
        if !legacy::looks_legacy(&plain) {
            return self.verify(&plain, signing_key, audience, now);
        }

        match legacy::decode(&plain, signing_key.expose(), now.saturating_mul(1000)) {
            Ok(session) => {
                debug!(cookie = audience, "accepted legacy session cookie");
                Some(ClaimSet::session(self.claims.issuer(), audience, now, session))
            }
            Err(err) => {
                warn!(cookie = audience, error = %err, "rejected legacy session cookie");
                None
            }
        }
    }

    fn plaintext(&self, value: &str, encrypt: bool) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if encrypt && !value.contains(TOKEN_SEPARATOR) && !legacy::looks_legacy(value) {
            return self.cipher.decrypt_or_log(value, &self.key);
        }
        Some(value.to_string())
    }

    fn verify(&self, token: &str, signing_key: &SigningKey, audience: &str, now: i64) -> Option<ClaimSet> {
        match self.claims.verify(token, signing_key, audience, now) {
            Ok(claims) => Some(claims),
            Err(TokenError::Expired) => {
                warn!(cookie = audience, "cookie token expired");
                None
            }
            Err(err) => {
                warn!(cookie = audience, error = %err, "cookie token rejected");
                None
            }
        }
    }
}
