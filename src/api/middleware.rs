//! Request lifecycle around the cookie gate.
//!
//! [`cookies`] wraps the whole router: it rebuilds the request state from the
//! incoming cookies and, once the handler has finished, writes back whatever
//! changed. [`enforce`] is layered on individual routes and runs their
//! [`FilterChain`] before the handler.

use crate::filters::{Decision, FilterChain, RequestContext, ResponseContext};
use crate::gate::Tollgate;
use crate::state::{Outcome, RequestPhase, RequestState};
use crate::token::now_unix_seconds;
use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// Request state shared between the middleware and the handler.
#[derive(Clone, Debug)]
pub struct SharedState(Arc<Mutex<RequestState>>);

impl SharedState {
    #[must_use]
    pub fn new(state: RequestState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Run `f` with exclusive access to the state.
    pub fn with<R>(&self, f: impl FnOnce(&mut RequestState) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Marks a response produced by a denying filter.
#[derive(Clone, Copy, Debug)]
struct Denied;

pub async fn cookies(State(gate): State<Arc<Tollgate>>, mut request: Request, next: Next) -> Response {
    debug!(phase = ?RequestPhase::Received, "request phase");
    let now = now_unix_seconds();
    let shared = SharedState::new(gate.read(request.headers(), now));
    request.extensions_mut().insert(shared.clone());

    let mut response = next.run(request).await;

    if response.extensions().get::<Denied>().is_some() {
        shared.with(|state| state.advance(RequestPhase::ResponseSent(Outcome::Denied)));
        return response;
    }

    let cookies = shared.with(|state| {
        state.advance(RequestPhase::HandlerExecuted);
        let session = gate.session_cookie(&state.session, now)?;
        let authentication = gate.authentication_cookie(&state.authentication, now)?;
        state.advance(RequestPhase::StateSerialized);
        Ok::<_, crate::Error>([session, authentication])
    });

    match cookies {
        Ok(cookies) => {
            for cookie in cookies.into_iter().flatten() {
                match HeaderValue::from_str(&cookie.header_value()) {
                    Ok(value) => {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(err) => error!(cookie = cookie.name(), "Invalid Set-Cookie header: {err}"),
                }
            }
            shared.with(|state| state.advance(RequestPhase::ResponseSent(Outcome::Completed)));
            response
        }
        Err(err) => {
            error!("Failed to issue cookies: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn enforce(State(chain): State<FilterChain>, request: Request, next: Next) -> Response {
    let Some(shared) = request.extensions().get::<SharedState>().cloned() else {
        error!("cookie middleware is not installed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let mut denial = ResponseContext::new();
    let decision = shared.with(|state| {
        let context = RequestContext {
            headers: request.headers(),
            query: request.uri().query(),
            session: &state.session,
            authentication: &state.authentication,
        };
        let decision = chain.evaluate(&context, &mut denial);
        state.advance(RequestPhase::FiltersEvaluated);
        decision
    });

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny(_) => {
            let mut response = denial.into_response();
            response.extensions_mut().insert(Denied);
            response
        }
    }
}
