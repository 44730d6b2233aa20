//! # Tollgate
//!
//! Stateless, cookie-backed request state for HTTP services.
//!
//! Every request carries two cookies: a **session** cookie holding string
//! key/value pairs plus the CSRF token, and an **authentication** cookie holding
//! the logged-in subject. Both are compact HS512 tokens, optionally encrypted
//! with AES-CBC under a key derived from the application secret. Nothing is
//! stored on the server.
//!
//! ## Request lifecycle
//!
//! 1. [`Tollgate::read`] decodes both cookies into a [`state::RequestState`].
//!    Tampered or expired cookies yield a fresh state marked invalid.
//! 2. A [`filters::FilterChain`] runs the configured access filters in order;
//!    the first denial short-circuits and shapes the response.
//! 3. The handler reads and mutates the state.
//! 4. Changed state is written back as `Set-Cookie` headers. Invalid or
//!    logged-out state clears its cookie. Denied requests write nothing.
//!
//! Session cookies written by the older `signature-data|csrf|expires` format
//! are still accepted on read and upgraded on the next write.

pub mod api;
pub mod cli;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod error;
pub mod filters;
pub mod gate;
pub mod state;
pub mod token;

pub use error::{Error, Result};
pub use gate::Tollgate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
