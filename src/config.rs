//! Startup configuration.
//!
//! Everything here is validated once before the server binds; a
//! [`ConfigurationError`] means the process must not serve requests.

use crate::crypto::{is_password_hash, SharedSecret, MIN_SECRET_LENGTH};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

pub const DEFAULT_APPLICATION_NAME: &str = "tollgate";
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "tollgate-session";
pub const DEFAULT_AUTHENTICATION_COOKIE_NAME: &str = "tollgate-auth";
pub const DEFAULT_EXPIRES_SECONDS: i64 = 3600;
pub const DEFAULT_REMEMBER_EXPIRES_SECONDS: i64 = 2_592_000;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("application secret is missing")]
    MissingSecret,
    #[error("secret must be at least {minimum} characters, got {length}")]
    SecretTooShort { length: usize, minimum: usize },
    #[error("unsupported cipher key length: {0}")]
    InvalidKeyLength(usize),
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),
    #[error("session and authentication cookies share the name {0:?}")]
    DuplicateCookieName(String),
    #[error("cookie {name:?} expiry must be positive, got {seconds}")]
    InvalidExpiry { name: String, seconds: i64 },
    #[error("invalid redirect url {0:?}")]
    InvalidRedirectUrl(String),
    #[error("application name is empty")]
    MissingApplicationName,
    #[error("basic password hash is not a PHC string")]
    InvalidPasswordHash,
}

/// Settings for one kind of cookie.
#[derive(Clone, Debug)]
pub struct CookieSettings {
    name: String,
    signing_key: Option<SecretString>,
    encrypt: bool,
    expires_seconds: i64,
    secure: bool,
}

impl CookieSettings {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signing_key: None,
            encrypt: false,
            expires_seconds: DEFAULT_EXPIRES_SECONDS,
            secure: false,
        }
    }

    #[must_use]
    pub fn with_signing_key(mut self, key: SecretString) -> Self {
        self.signing_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    #[must_use]
    pub fn with_expires_seconds(mut self, seconds: i64) -> Self {
        self.expires_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signing key override; `None` means sign with the shared secret.
    #[must_use]
    pub fn signing_key(&self) -> Option<&str> {
        self.signing_key.as_ref().map(ExposeSecret::expose_secret)
    }

    #[must_use]
    pub const fn encrypt(&self) -> bool {
        self.encrypt
    }

    #[must_use]
    pub const fn expires_seconds(&self) -> i64 {
        self.expires_seconds
    }

    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if !valid_cookie_name(&self.name) {
            return Err(ConfigurationError::InvalidCookieName(self.name.clone()));
        }
        if self.expires_seconds <= 0 {
            return Err(ConfigurationError::InvalidExpiry {
                name: self.name.clone(),
                seconds: self.expires_seconds,
            });
        }
        if let Some(key) = self.signing_key() {
            let length = key.chars().count();
            if length < MIN_SECRET_LENGTH {
                return Err(ConfigurationError::SecretTooShort {
                    length,
                    minimum: MIN_SECRET_LENGTH,
                });
            }
        }
        Ok(())
    }
}

/// How the configured basic-auth password is stored.
#[derive(Clone, Debug)]
pub enum BasicPassword {
    Plain(SecretString),
    /// Argon2 PHC string, e.g. `$argon2id$v=19$...`.
    Argon2(String),
}

/// Credentials for the bundled basic-auth validators.
#[derive(Clone, Debug)]
pub struct BasicCredentials {
    pub username: String,
    pub password: BasicPassword,
}

#[derive(Clone, Debug)]
pub struct Config {
    application_name: String,
    secret: SharedSecret,
    session: CookieSettings,
    authentication: CookieSettings,
    remember_expires_seconds: i64,
    redirect_url: Option<String>,
    basic: Option<BasicCredentials>,
}

impl Config {
    #[must_use]
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            secret,
            session: CookieSettings::new(DEFAULT_SESSION_COOKIE_NAME),
            authentication: CookieSettings::new(DEFAULT_AUTHENTICATION_COOKIE_NAME),
            remember_expires_seconds: DEFAULT_REMEMBER_EXPIRES_SECONDS,
            redirect_url: None,
            basic: None,
        }
    }

    #[must_use]
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session(mut self, settings: CookieSettings) -> Self {
        self.session = settings;
        self
    }

    #[must_use]
    pub fn with_authentication(mut self, settings: CookieSettings) -> Self {
        self.authentication = settings;
        self
    }

    #[must_use]
    pub fn with_remember_expires_seconds(mut self, seconds: i64) -> Self {
        self.remember_expires_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_basic_credentials(mut self, credentials: BasicCredentials) -> Self {
        self.basic = Some(credentials);
        self
    }

    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    #[must_use]
    pub const fn secret(&self) -> &SharedSecret {
        &self.secret
    }

    #[must_use]
    pub const fn session(&self) -> &CookieSettings {
        &self.session
    }

    #[must_use]
    pub const fn authentication(&self) -> &CookieSettings {
        &self.authentication
    }

    #[must_use]
    pub const fn remember_expires_seconds(&self) -> i64 {
        self.remember_expires_seconds
    }

    #[must_use]
    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    #[must_use]
    pub const fn basic_credentials(&self) -> Option<&BasicCredentials> {
        self.basic.as_ref()
    }

    /// Check every setting that could make request handling misbehave.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.application_name.trim().is_empty() {
            return Err(ConfigurationError::MissingApplicationName);
        }
        self.session.validate()?;
        self.authentication.validate()?;
        if self.session.name == self.authentication.name {
            return Err(ConfigurationError::DuplicateCookieName(
                self.session.name.clone(),
            ));
        }
        if self.remember_expires_seconds <= 0 {
            return Err(ConfigurationError::InvalidExpiry {
                name: self.authentication.name.clone(),
                seconds: self.remember_expires_seconds,
            });
        }
        if let Some(url) = &self.redirect_url {
            validate_redirect_url(url)?;
        }
        if let Some(BasicCredentials {
            password: BasicPassword::Argon2(hash),
            ..
        }) = &self.basic
        {
            if !is_password_hash(hash) {
                return Err(ConfigurationError::InvalidPasswordHash);
            }
        }
        Ok(())
    }
}

static COOKIE_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").ok());

/// RFC 6265 cookie-name token.
#[must_use]
pub fn valid_cookie_name(name: &str) -> bool {
    COOKIE_NAME.as_ref().is_some_and(|re| re.is_match(name))
}

/// Accept an absolute http(s) URL or a same-site absolute path.
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidRedirectUrl`] for anything else.
pub fn validate_redirect_url(value: &str) -> Result<(), ConfigurationError> {
    if value.starts_with('/') && !value.starts_with("//") {
        return Ok(());
    }
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ConfigurationError::InvalidRedirectUrl(value.to_string())),
    }
}
