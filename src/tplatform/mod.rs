#![allow(clippy::needless_for_each)]

use crate::tplatform::{
    confirmation::{ConfirmationFlow, ConfirmationState, ConfirmationType},
    handlers::{
        confirm::{__path_confirm_api, __path_open_app, ConfirmationResponse},
        health,
        health::__path_health,
    },
    handoff::{CompanionApp, HandoffPlan},
    view::{Presentation, PrimaryAction},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request, header::CONTENT_TYPE},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod analytics;
pub mod confirmation;
pub mod handlers;
pub mod handoff;
pub mod provider;
pub mod view;

#[cfg(test)]
pub(crate) mod test_utils;

#[derive(OpenApi)]
#[openapi(
    paths(health, confirm_api, open_app),
    components(schemas(
        health::Health,
        ConfirmationResponse,
        ConfirmationState,
        ConfirmationType,
        Presentation,
        PrimaryAction,
        HandoffPlan
    )),
    tags(
        (name = "confirm", description = "Email confirmation and app handoff"),
        (name = "health", description = "Service and identity provider health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router.
///
/// The flow and the companion app description are created once by the caller
/// and shared by every request.
pub fn router(flow: Arc<ConfirmationFlow>, app: Arc<CompanionApp>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/", get(|| async { "🌱" }))
        .route("/confirm", get(handlers::confirm_page))
        .route("/confirm/retry", get(handlers::retry_page))
        .route("/open-app", get(handlers::open_app))
        .route("/v1/confirm", get(handlers::confirm_api))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(flow.clone()))
                .layer(Extension(app)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(flow))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, flow: Arc<ConfirmationFlow>, app: Arc<CompanionApp>) -> Result<()> {
    let app = router(flow, app);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
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
