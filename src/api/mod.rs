use crate::{
    api::handlers::{auth, basic, health, session},
    filters::{CredentialValidator, FilterChain},
    gate::Tollgate,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
pub mod middleware;

/// Build the router with every route and its filter chain.
#[must_use]
pub fn router(gate: Arc<Tollgate>, validator: Arc<dyn CredentialValidator>) -> Router {
    let authenticated = FilterChain::new().with(gate.authentication_filter());
    let csrf = FilterChain::new().with(gate.authenticity_filter());
    let authenticated_csrf = FilterChain::new()
        .with(gate.authentication_filter())
        .with(gate.authenticity_filter());
    let basic_auth = FilterChain::new().with(gate.basic_filter(validator.clone()));

    Router::new()
        .route(
            "/login",
            post(auth::login).route_layer(from_fn_with_state(csrf.clone(), middleware::enforce)),
        )
        .route(
            "/logout",
            post(auth::logout).route_layer(from_fn_with_state(
                authenticated_csrf,
                middleware::enforce,
            )),
        )
        .route(
            "/me",
            get(auth::me).route_layer(from_fn_with_state(authenticated, middleware::enforce)),
        )
        .route(
            "/session/:key",
            put(session::put_value)
                .delete(session::delete_value)
                .route_layer(from_fn_with_state(csrf, middleware::enforce)),
        )
        .route(
            "/basic",
            get(basic).route_layer(from_fn_with_state(basic_auth, middleware::enforce)),
        )
        .route("/session", get(session::values))
        .route("/csrf", get(session::csrf))
        .route("/health", get(health::health))
        .layer(from_fn_with_state(gate.clone(), middleware::cookies))
        .layer(Extension(validator))
        .layer(Extension(gate))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, gate: Arc<Tollgate>, validator: Arc<dyn CredentialValidator>) -> Result<()> {
    let app = router(gate, validator).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
