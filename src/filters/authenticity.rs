use super::{Decision, Filter, RequestContext, ResponseContext};
use crate::error::AccessError;
use axum::http::{HeaderName, StatusCode};
use subtle::ConstantTimeEq;

pub static CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");
pub const CSRF_QUERY_PARAMETER: &str = "authenticityToken";

const DEFAULT_BODY: &str = "Forbidden";

/// Requires the submitted authenticity token to equal the session's.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthenticityFilter;

impl AuthenticityFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn submitted<'a>(request: &RequestContext<'a>) -> Option<&'a str> {
        if let Some(value) = request.headers.get(&CSRF_HEADER) {
            return value.to_str().ok();
        }
        request.query?.split('&').find_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            (name == CSRF_QUERY_PARAMETER).then_some(value)
        })
    }
}

impl Filter for AuthenticityFilter {
    fn name(&self) -> &'static str {
        "authenticity"
    }

    fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision {
        let matches = match (Self::submitted(request), request.session.csrf_token()) {
            (Some(submitted), Some(expected)) => {
                bool::from(submitted.as_bytes().ct_eq(expected.as_bytes()))
            }
            _ => false,
        };
        if matches {
            return Decision::Allow;
        }

        response.set_status(StatusCode::FORBIDDEN);
        response.set_body(DEFAULT_BODY);
        Decision::Deny(AccessError::CsrfMismatch)
    }
}
