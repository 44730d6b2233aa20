use crate::api::middleware::SharedState;
use crate::filters::CredentialValidator;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
    #[serde(default)]
    remember: bool,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("remember", &self.remember)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Me {
    pub user: String,
    #[serde(rename = "twoFactor")]
    pub two_factor: bool,
    pub remember: bool,
}

pub async fn login(
    Extension(state): Extension<SharedState>,
    Extension(validator): Extension<Arc<dyn CredentialValidator>>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    if request.username.trim().is_empty()
        || !validator.validate(&request.username, &request.password)
    {
        warn!(user = %request.username, "login rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let me = state.with(|state| {
        state
            .authentication
            .login(&request.username, request.remember);
        Me {
            user: request.username.clone(),
            two_factor: state.authentication.is_two_factor_pending(),
            remember: state.authentication.remember(),
        }
    });
    debug!(user = %me.user, "login accepted");

    (StatusCode::OK, Json(me)).into_response()
}

pub async fn logout(Extension(state): Extension<SharedState>) -> impl IntoResponse {
    state.with(|state| state.authentication.logout());
    StatusCode::NO_CONTENT
}

pub async fn me(Extension(state): Extension<SharedState>) -> impl IntoResponse {
    let me = state.with(|state| {
        let authentication = &state.authentication;
        authentication.subject().map(|user| Me {
            user: user.to_string(),
            two_factor: authentication.is_two_factor_pending(),
            remember: authentication.remember(),
        })
    });

    match me {
        Some(me) => (StatusCode::OK, Json(me)).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}
