//! Signed, expiring claim tokens.
//!
//! Tokens use the compact `header.payload.signature` form with HS512, so any
//! standard JWT tooling can inspect them. Verification is stateless.

mod claims;
mod error;
mod jwt;

pub use claims::{AuthenticationClaims, ClaimSet, SessionClaims};
pub use error::TokenError;
pub use jwt::{ClaimsCodec, SigningKey, TokenHeader};

use time::OffsetDateTime;

#[must_use]
pub fn now_unix_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
