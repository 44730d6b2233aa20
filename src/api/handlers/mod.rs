pub mod auth;
pub mod health;
pub mod session;

use crate::gate::Tollgate;
use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

// reached only once the basic filter accepted the credentials
pub async fn basic(Extension(gate): Extension<Arc<Tollgate>>) -> Json<Value> {
    Json(json!({ "realm": gate.config().application_name() }))
}
