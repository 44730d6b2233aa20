use super::{Decision, Filter, RequestContext, ResponseContext};
use crate::error::AccessError;
use axum::http::{header::LOCATION, HeaderValue, StatusCode};

const DEFAULT_BODY: &str = "Unauthorized";

/// Requires an authenticated user.
///
/// Anonymous requests are redirected when a URL is configured and get a
/// plain 401 otherwise.
#[derive(Clone, Debug, Default)]
pub struct AuthenticationFilter {
    redirect: Option<String>,
}

impl AuthenticationFilter {
    #[must_use]
    pub const fn new(redirect: Option<String>) -> Self {
        Self { redirect }
    }

    fn unauthorized(response: &mut ResponseContext) {
        response.set_status(StatusCode::UNAUTHORIZED);
        response.set_body(DEFAULT_BODY);
    }
}

impl Filter for AuthenticationFilter {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision {
        if request.authentication.has_authenticated_user() {
            return Decision::Allow;
        }

        match self
            .redirect
            .as_deref()
            .and_then(|url| HeaderValue::from_str(url).ok())
        {
            Some(location) => {
                response.set_status(StatusCode::FOUND);
                response.set_header(LOCATION, location);
            }
            None => Self::unauthorized(response),
        }
        Decision::Deny(AccessError::Unauthenticated)
    }
}
