//! Access filters evaluated before a handler runs.
//!
//! A [`FilterChain`] runs its filters in the order they were added and stops
//! at the first denial. A denying filter writes its status, headers and body
//! into the [`ResponseContext`]; the request never reaches the handler.

mod authentication;
mod authenticity;
mod basic;

pub use authentication::AuthenticationFilter;
pub use authenticity::{AuthenticityFilter, CSRF_HEADER, CSRF_QUERY_PARAMETER};
pub use basic::{
    BasicAuthenticationFilter, CredentialValidator, HashedCredentials, StaticCredentials,
};

use crate::error::AccessError;
use crate::state::{AuthenticationState, SessionState};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(AccessError),
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// The parts of a request filters look at.
#[derive(Clone, Copy, Debug)]
pub struct RequestContext<'a> {
    pub headers: &'a HeaderMap,
    pub query: Option<&'a str>,
    pub session: &'a SessionState,
    pub authentication: &'a AuthenticationState,
}

/// Side effects of a denial.
#[derive(Debug, Default)]
pub struct ResponseContext {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Option<String>,
}

impl ResponseContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl IntoResponse for ResponseContext {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or(StatusCode::FORBIDDEN);
        let mut response = (status, Body::from(self.body.unwrap_or_default())).into_response();
        response.headers_mut().extend(self.headers);
        response
    }
}

pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision;
}

/// The filters a route can declare.
#[derive(Clone, Debug)]
pub enum AccessFilter {
    Authentication(AuthenticationFilter),
    Authenticity(AuthenticityFilter),
    Basic(BasicAuthenticationFilter),
}

impl Filter for AccessFilter {
    fn name(&self) -> &'static str {
        match self {
            Self::Authentication(filter) => filter.name(),
            Self::Authenticity(filter) => filter.name(),
            Self::Basic(filter) => filter.name(),
        }
    }

    fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision {
        match self {
            Self::Authentication(filter) => filter.evaluate(request, response),
            Self::Authenticity(filter) => filter.evaluate(request, response),
            Self::Basic(filter) => filter.evaluate(request, response),
        }
    }
}

impl From<AuthenticationFilter> for AccessFilter {
    fn from(filter: AuthenticationFilter) -> Self {
        Self::Authentication(filter)
    }
}

impl From<AuthenticityFilter> for AccessFilter {
    fn from(filter: AuthenticityFilter) -> Self {
        Self::Authenticity(filter)
    }
}

impl From<BasicAuthenticationFilter> for AccessFilter {
    fn from(filter: BasicAuthenticationFilter) -> Self {
        Self::Basic(filter)
    }
}

/// Ordered, short-circuiting list of filters.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    filters: Vec<AccessFilter>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, filter: impl Into<AccessFilter>) -> Self {
        self.filters.push(filter.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Run the filters in order; the first denial ends evaluation.
    #[must_use]
    pub fn evaluate(&self, request: &RequestContext<'_>, response: &mut ResponseContext) -> Decision {
        for filter in &self.filters {
            if let Decision::Deny(err) = filter.evaluate(request, response) {
                warn!(filter = filter.name(), error = %err, "request denied");
                return Decision::Deny(err);
            }
        }
        Decision::Allow
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::header::{AUTHORIZATION, LOCATION, WWW_AUTHENTICATE};
    use base64ct::{Base64, Encoding};
    use std::sync::Arc;

    pub(crate) fn context<'a>(
        headers: &'a HeaderMap,
        query: Option<&'a str>,
        session: &'a SessionState,
        authentication: &'a AuthenticationState,
    ) -> RequestContext<'a> {
        RequestContext {
            headers,
            query,
            session,
            authentication,
        }
    }

    fn basic_filter() -> BasicAuthenticationFilter {
        BasicAuthenticationFilter::new(
            "tollgate",
            Arc::new(|user: &str, password: &str| user == "admin" && password == "secret"),
        )
    }

    #[test]
    fn empty_chain_allows() {
        let headers = HeaderMap::new();
        let session = SessionState::new();
        let auth = AuthenticationState::new();
        let mut response = ResponseContext::new();
        let decision = FilterChain::new().evaluate(
            &context(&headers, None, &session, &auth),
            &mut response,
        );
        assert!(decision.is_allowed());
        assert!(response.status().is_none());
    }

    #[test]
    fn first_denial_short_circuits() {
        // both filters would deny; only the first one may write the response
        let chain = FilterChain::new()
            .with(AuthenticationFilter::new(Some("/login".to_string())))
            .with(basic_filter());
        assert_eq!(chain.len(), 2);

        let headers = HeaderMap::new();
        let session = SessionState::new();
        let auth = AuthenticationState::new();
        let mut response = ResponseContext::new();
        let decision = chain.evaluate(&context(&headers, None, &session, &auth), &mut response);

        assert_eq!(decision, Decision::Deny(AccessError::Unauthenticated));
        assert_eq!(response.status(), Some(StatusCode::FOUND));
        assert!(response.headers().get(LOCATION).is_some());
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn order_is_caller_declared() {
        let chain = FilterChain::new()
            .with(basic_filter())
            .with(AuthenticationFilter::new(None));

        let headers = HeaderMap::new();
        let session = SessionState::new();
        let auth = AuthenticationState::new();
        let mut response = ResponseContext::new();
        let decision = chain.evaluate(&context(&headers, None, &session, &auth), &mut response);

        assert_eq!(decision, Decision::Deny(AccessError::Credential));
        assert!(response.headers().get(WWW_AUTHENTICATE).is_some());
    }

    #[test]
    fn all_filters_pass() -> Result<(), axum::http::header::InvalidHeaderValue> {
        let mut session = SessionState::new();
        let token = session.current_or_new_csrf_token();
        let mut auth = AuthenticationState::new();
        auth.login("alice", false);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!(
                "Basic {}",
                Base64::encode_string(b"admin:secret")
            ))?,
        );
        headers.insert(CSRF_HEADER.clone(), HeaderValue::from_str(&token)?);

        let chain = FilterChain::new()
            .with(AuthenticationFilter::new(None))
            .with(AuthenticityFilter::new())
            .with(basic_filter());
        let mut response = ResponseContext::new();
        let decision = chain.evaluate(&context(&headers, None, &session, &auth), &mut response);
        assert!(decision.is_allowed());
        Ok(())
    }

    #[test]
    fn response_context_renders() {
        let mut response = ResponseContext::new();
        response.set_status(StatusCode::UNAUTHORIZED);
        response.set_body("Unauthorized");
        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
