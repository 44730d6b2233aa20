use crate::api::middleware::SharedState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug)]
pub struct CsrfToken {
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionValue {
    pub value: String,
}

/// Return the session's CSRF token, creating it if needed.
pub async fn csrf(Extension(state): Extension<SharedState>) -> impl IntoResponse {
    let token = state.with(|state| state.session.current_or_new_csrf_token());
    Json(CsrfToken { token })
}

pub async fn values(Extension(state): Extension<SharedState>) -> Json<BTreeMap<String, String>> {
    Json(state.with(|state| state.session.values().clone()))
}

pub async fn put_value(
    Extension(state): Extension<SharedState>,
    Path(key): Path<String>,
    Json(body): Json<SessionValue>,
) -> impl IntoResponse {
    let stored = state.with(|state| {
        state.session.add(&key, &body.value);
        state.session.get(&key).is_some_and(|value| value == body.value)
    });

    if stored {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

pub async fn delete_value(
    Extension(state): Extension<SharedState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    state.with(|state| state.session.remove(&key));
    StatusCode::NO_CONTENT
}
