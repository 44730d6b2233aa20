//! Symmetric encryption for cookie values, plus the password and TOTP checks
//! behind login.
//!
//! Keys are sliced from the configured shared secret once at startup and
//! never change while the process runs.

mod cipher;
mod key;
mod password;
mod totp;

pub use cipher::{CipherEngine, CipherError};
pub use key::{CipherSuite, DerivedKey, SharedSecret, MIN_SECRET_LENGTH};
pub use password::{hash_password, is_password_hash, verify_password};
pub use totp::{generate_totp_secret, verify_totp, TOTP_DIGITS, TOTP_PERIOD_SECONDS};
