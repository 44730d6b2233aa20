use crate::{config::ConfigurationError, crypto::CipherError, token::TokenError};
use thiserror::Error;

/// Reason a filter refused a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("no authenticated user")]
    Unauthenticated,
    #[error("authenticity token mismatch")]
    CsrfMismatch,
    #[error("invalid credentials")]
    Credential,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
