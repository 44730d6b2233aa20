//! The process-wide cookie gate.
//!
//! [`Tollgate`] is built once from a validated [`Config`] and shared by every
//! request. It holds only immutable key material.

use crate::config::{Config, ConfigurationError, CookieSettings};
use crate::cookie::{self, CookieCodec, OutboundCookie};
use crate::crypto::DerivedKey;
use crate::error::Result;
use crate::filters::{
    AuthenticationFilter, AuthenticityFilter, BasicAuthenticationFilter, CredentialValidator,
};
use crate::state::{AuthenticationState, RequestState, SessionState};
use crate::token::{ClaimSet, ClaimsCodec, SigningKey};
use axum::http::HeaderMap;
use std::{fmt, sync::Arc};
use tracing::{debug, instrument, warn};

pub struct Tollgate {
    config: Config,
    codec: CookieCodec,
    session_key: SigningKey,
    authentication_key: SigningKey,
}

impl Tollgate {
    /// Validate `config` and derive every key.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the configuration is unusable.
    pub fn new(config: Config) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let key = DerivedKey::derive(config.secret())?;
        debug!(suite = ?key.suite(), "derived cookie encryption key");

        let session_key = signing_key(&config, config.session())?;
        let authentication_key = signing_key(&config, config.authentication())?;
        let codec = CookieCodec::new(ClaimsCodec::new(config.application_name()), key);

        Ok(Self {
            config,
            codec,
            session_key,
            authentication_key,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    /// Rebuild both state objects from the request's cookies.
    #[must_use]
    #[instrument(level = "debug", skip_all)]
    pub fn read(&self, headers: &HeaderMap, now: i64) -> RequestState {
        let session = self.read_session(cookie::find(headers, self.config.session().name()), now);
        let authentication = self.read_authentication(
            cookie::find(headers, self.config.authentication().name()),
            now,
        );
        RequestState::new(session, authentication)
    }

    #[must_use]
    pub fn read_session(&self, value: Option<&str>, now: i64) -> SessionState {
        let Some(value) = value else {
            return SessionState::new();
        };
        let settings = self.config.session();
        self.codec
            .parse_session(value, &self.session_key, settings.encrypt(), settings.name(), now)
            .map_or_else(SessionState::rejected, |claims| {
                claims.into_session().map_or_else(
                    |err| {
                        warn!(cookie = settings.name(), error = %err, "session cookie has the wrong shape");
                        SessionState::rejected()
                    },
                    SessionState::from_claims,
                )
            })
    }

    #[must_use]
    pub fn read_authentication(&self, value: Option<&str>, now: i64) -> AuthenticationState {
        let Some(value) = value else {
            return AuthenticationState::new();
        };
        let settings = self.config.authentication();
        self.codec
            .parse(value, &self.authentication_key, settings.encrypt(), settings.name(), now)
            .map_or_else(AuthenticationState::rejected, |claims| {
                claims.into_authentication().map_or_else(
                    |err| {
                        warn!(cookie = settings.name(), error = %err, "authentication cookie has the wrong shape");
                        AuthenticationState::rejected()
                    },
                    AuthenticationState::from_claims,
                )
            })
    }

    /// The `Set-Cookie` needed for the session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie cannot be signed or encrypted.
    pub fn session_cookie(&self, session: &SessionState, now: i64) -> Result<Option<OutboundCookie>> {
        let settings = self.config.session();
        if session.is_invalid() {
            return Ok(Some(clear(settings)));
        }
        if !session.is_dirty() {
            return Ok(None);
        }

        let max_age = settings.expires_seconds();
        let claims = ClaimSet::session(
            self.config.application_name(),
            settings.name(),
            now,
            session.to_claims(now.saturating_add(max_age)),
        );
        let value = self.codec.compose(&claims, &self.session_key, settings.encrypt())?;
        Ok(Some(set(settings, value, max_age)))
    }

    /// The `Set-Cookie` needed for the authentication, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie cannot be signed or encrypted.
    pub fn authentication_cookie(
        &self,
        authentication: &AuthenticationState,
        now: i64,
    ) -> Result<Option<OutboundCookie>> {
        let settings = self.config.authentication();
        if authentication.is_invalid() || authentication.is_logged_out() {
            return Ok(Some(clear(settings)));
        }
        if !authentication.is_dirty() {
            return Ok(None);
        }

        let max_age = if authentication.remember() {
            self.config.remember_expires_seconds()
        } else {
            settings.expires_seconds()
        };
        let Some(claims) = authentication.to_claims(now.saturating_add(max_age)) else {
            return Ok(None);
        };
        let claims = ClaimSet::authentication(
            self.config.application_name(),
            settings.name(),
            now,
            claims,
        );
        let value = self
            .codec
            .compose(&claims, &self.authentication_key, settings.encrypt())?;
        Ok(Some(set(settings, value, max_age)))
    }

    #[must_use]
    pub fn authentication_filter(&self) -> AuthenticationFilter {
        AuthenticationFilter::new(self.config.redirect_url().map(ToString::to_string))
    }

    #[must_use]
    pub const fn authenticity_filter(&self) -> AuthenticityFilter {
        AuthenticityFilter::new()
    }

    #[must_use]
    pub fn basic_filter(&self, validator: Arc<dyn CredentialValidator>) -> BasicAuthenticationFilter {
        BasicAuthenticationFilter::new(self.config.application_name(), validator)
    }
}

impl fmt::Debug for Tollgate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tollgate")
            .field("application_name", &self.config.application_name())
            .field("session", &self.config.session().name())
            .field("authentication", &self.config.authentication().name())
            .finish_non_exhaustive()
    }
}

fn signing_key(config: &Config, settings: &CookieSettings) -> Result<SigningKey, ConfigurationError> {
    match settings.signing_key() {
        Some(key) => SigningKey::new(key),
        None => Ok(SigningKey::from_secret(config.secret())),
    }
}

fn set(settings: &CookieSettings, value: String, max_age: i64) -> OutboundCookie {
    OutboundCookie::Set {
        name: settings.name().to_string(),
        value,
        max_age,
        secure: settings.secure(),
    }
}

fn clear(settings: &CookieSettings) -> OutboundCookie {
    OutboundCookie::Clear {
        name: settings.name().to_string(),
        secure: settings.secure(),
    }
}
