use super::{Decision, Filter, RequestContext, ResponseContext};
use crate::crypto::verify_password;
use crate::error::AccessError;
use axum::http::{
    header::{AUTHORIZATION, WWW_AUTHENTICATE},
    HeaderValue, StatusCode,
};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use subtle::ConstantTimeEq;

const DEFAULT_BODY: &str = "Unauthorized";

/// Decides whether a username/password pair is acceptable.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, username: &str, password: &str) -> bool;
}

impl<F> CredentialValidator for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn validate(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

/// A single configured username and password.
pub struct StaticCredentials {
    username: String,
    password: SecretString,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl CredentialValidator for StaticCredentials {
    fn validate(&self, username: &str, password: &str) -> bool {
        let user = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass = password
            .as_bytes()
            .ct_eq(self.password.expose_secret().as_bytes());
        bool::from(user & pass)
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A single username with an Argon2 PHC password hash.
pub struct HashedCredentials {
    username: String,
    hash: String,
}

impl HashedCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            hash: hash.into(),
        }
    }
}

impl CredentialValidator for HashedCredentials {
    fn validate(&self, username: &str, password: &str) -> bool {
        // always hash, even for an unknown username
        let user = bool::from(username.as_bytes().ct_eq(self.username.as_bytes()));
        let pass = verify_password(password, &self.hash);
        user & pass
    }
}

impl fmt::Debug for HashedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// HTTP basic authentication against a [`CredentialValidator`].
#[derive(Clone)]
pub struct BasicAuthenticationFilter {
    realm: String,
    validator: Arc<dyn CredentialValidator>,
}

impl BasicAuthenticationFilter {
    #[must_use]
    pub fn new(realm: impl Into<String>, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            realm: realm.into(),
            validator,
        }
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// `username:password` from a `Basic` authorization header.
    fn credentials(request: &RequestContext<'_>) -> Option<(String, String)> {
        let header = request.headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
        let (scheme, encoded) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = Base64::decode_vec(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some((username.to_string(), password.to_string()))
    }
}

impl fmt::Debug for BasicAuthenticationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthenticationFilter")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

impl Filter for BasicAuthenticationFilter {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision {
        if let Some((username, password)) = Self::credentials(request) {
            if self.validator.validate(&username, &password) {
                return Decision::Allow;
            }
        }

        response.set_status(StatusCode::UNAUTHORIZED);
        let challenge = format!("Basic realm=\"{}\"", self.realm.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&challenge) {
            response.set_header(WWW_AUTHENTICATE, value);
        }
        response.set_body(DEFAULT_BODY);
        Decision::Deny(AccessError::Credential)
    }
}
