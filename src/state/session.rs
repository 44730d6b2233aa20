use crate::token::SessionClaims;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::collections::BTreeMap;
use tracing::warn;

const CSRF_TOKEN_BYTES: usize = 32;

/// Characters the legacy layout uses as separators.
const RESERVED: [char; 4] = ['|', ':', '&', ' '];

#[must_use]
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Session values carried by the session cookie for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    values: BTreeMap<String, String>,
    csrf_token: Option<String>,
    expires: i64,
    dirty: bool,
    invalid: bool,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            values: claims.data,
            csrf_token: claims.csrf_token,
            expires: claims.expires,
            ..Self::default()
        }
    }

    /// Empty state standing in for a cookie that failed to parse.
    #[must_use]
    pub fn rejected() -> Self {
        Self {
            invalid: true,
            ..Self::default()
        }
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.touch();
        if key.is_empty() || key.contains(RESERVED) || value.contains(RESERVED) {
            warn!(key, "session key or value contains a reserved character, ignored");
            return;
        }
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) {
        self.touch();
        self.values.remove(key);
    }

    /// Drop every value and the token, and clear the cookie.
    pub fn clear(&mut self) {
        self.values.clear();
        self.csrf_token = None;
        self.dirty = false;
        self.invalid = true;
    }

    /// Mark the cookie for removal without touching the values.
    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.values.is_empty()
    }

    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// The session's CSRF token, created on first use.
    pub fn current_or_new_csrf_token(&mut self) -> String {
        if let Some(token) = &self.csrf_token {
            return token.clone();
        }
        let token = generate_csrf_token();
        self.csrf_token = Some(token.clone());
        self.touch();
        token
    }

    #[must_use]
    pub const fn expires(&self) -> i64 {
        self.expires
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Claims for reissuing the cookie with a new expiry.
    #[must_use]
    pub fn to_claims(&self, expires: i64) -> SessionClaims {
        SessionClaims {
            data: self.values.clone(),
            csrf_token: self.csrf_token.clone(),
            expires,
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.invalid = false;
    }
}
