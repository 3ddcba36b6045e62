//! Confirmation callback pages and JSON API.

use crate::tplatform::{
    confirmation::{ConfirmationFlow, ConfirmationPage, ConfirmationState, QueryParams},
    handoff::{CompanionApp, HandoffPlan},
    view::{CONFIRM_PATH, Presentation, render_page},
};
use axum::{
    extract::{Extension, RawQuery},
    http::{
        HeaderName,
        header::{CACHE_CONTROL, REFERRER_POLICY},
    },
    response::{Html, IntoResponse, Json, Redirect},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

// confirmation links carry single-use tokens in the query string
fn no_store() -> [(HeaderName, &'static str); 2] {
    [(CACHE_CONTROL, "no-store"), (REFERRER_POLICY, "no-referrer")]
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ConfirmationResponse {
    state: ConfirmationState,
    message: String,
    user_email: Option<String>,
    presentation: Presentation,
    handoff: Option<HandoffPlan>,
}

/// Confirmation page: verify the token once and render the outcome.
#[instrument(skip_all)]
pub async fn confirm_page(
    RawQuery(query): RawQuery,
    flow: Extension<Arc<ConfirmationFlow>>,
    app: Extension<Arc<CompanionApp>>,
) -> impl IntoResponse {
    let mut page = ConfirmationPage::new(QueryParams::parse(query.as_deref().unwrap_or_default()));

    page.run(&flow).await;

    debug!("confirmation page state: {}", page.state().as_str());

    let html = render_page(
        page.result(),
        &app,
        &page.params().to_query_string(),
        None,
    );

    (no_store(), Html(html))
}

/// Retry: show `loading` and reload the confirmation page with the same query.
///
/// Nothing from the previous attempt is carried over; the reloaded page runs a
/// fresh verification.
#[instrument(skip_all)]
pub async fn retry_page(
    RawQuery(query): RawQuery,
    app: Extension<Arc<CompanionApp>>,
) -> impl IntoResponse {
    let page = ConfirmationPage::new(QueryParams::parse(query.as_deref().unwrap_or_default()));

    let query = page.params().to_query_string();
    let target = if query.is_empty() {
        CONFIRM_PATH.to_string()
    } else {
        format!("{CONFIRM_PATH}?{query}")
    };

    let html = render_page(page.result(), &app, &query, Some(&target));

    (no_store(), Html(html))
}

/// Best-effort handoff to the native app.
#[utoipa::path(
    get,
    path = "/open-app",
    responses(
        (status = 303, description = "Redirect to the companion app deep link")
    ),
    tag = "confirm"
)]
pub async fn open_app(app: Extension<Arc<CompanionApp>>) -> Redirect {
    Redirect::to(&app.login_link())
}

/// Verify a confirmation token and return the outcome as JSON.
#[utoipa::path(
    get,
    path = "/v1/confirm",
    params(
        ("token" = Option<String>, Query, description = "One-time confirmation token"),
        ("type" = Option<String>, Query, description = "signup, recovery, invite, magiclink or any other type the identity provider accepts (default signup)")
    ),
    responses(
        (status = 200, description = "Confirmation outcome", body = ConfirmationResponse)
    ),
    tag = "confirm"
)]
#[instrument(skip_all)]
pub async fn confirm_api(
    RawQuery(query): RawQuery,
    flow: Extension<Arc<ConfirmationFlow>>,
    app: Extension<Arc<CompanionApp>>,
) -> impl IntoResponse {
    let mut page = ConfirmationPage::new(QueryParams::parse(query.as_deref().unwrap_or_default()));

    page.run(&flow).await;

    let result = page.into_result();
    let presentation = Presentation::for_result(&result, &app);
    let handoff = (result.state == ConfirmationState::Success).then(|| app.handoff());

    let response = ConfirmationResponse {
        state: result.state,
        message: result.message,
        user_email: result.user_email,
        presentation,
        handoff,
    };

    (no_store(), Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tplatform::{
        confirmation::MSG_MISSING_TOKEN,
        provider::ProviderError,
        test_utils::{FakeProvider, RecordingAnalytics},
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::LOCATION},
        routing::get,
    };
    use tower::ServiceExt;
    use url::Url;

    fn router(provider: Arc<FakeProvider>) -> Router {
        let flow = Arc::new(ConfirmationFlow::new(
            provider,
            Arc::new(RecordingAnalytics::default()),
        ));
        let app = Arc::new(CompanionApp::new(
            "TplatForm".to_string(),
            Url::parse("tplatform://app/").unwrap(),
        ));
        Router::new()
            .route("/confirm", get(confirm_page))
            .route("/confirm/retry", get(retry_page))
            .route("/open-app", get(open_app))
            .route("/v1/confirm", get(confirm_api))
            .layer(Extension(flow))
            .layer(Extension(app))
    }

    async fn body_string(response: axum::response::Response) -> anyhow::Result<String> {
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(body.to_vec())?)
    }

    #[tokio::test]
    async fn confirm_page_renders_success() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::user(Some("user@example.com")));
        let response = router(provider.clone())
            .oneshot(Request::builder().uri("/confirm?token=abc123").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CACHE_CONTROL).unwrap(), "no-store");
        let html = body_string(response).await?;
        assert!(html.contains("data-state=\"success\""));
        assert!(html.contains("user@example.com"));
        assert_eq!(provider.call_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn confirm_page_without_token() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::user(None));
        let response = router(provider.clone())
            .oneshot(Request::builder().uri("/confirm").body(Body::empty())?)
            .await?;

        let html = body_string(response).await?;
        assert!(html.contains("data-state=\"error\""));
        assert!(html.contains(MSG_MISSING_TOKEN));
        assert_eq!(provider.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn retry_page_is_loading_and_reloads() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::user(None));
        let response = router(provider.clone())
            .oneshot(
                Request::builder()
                    .uri("/confirm/retry?token=bad-tok&type=signup")
                    .body(Body::empty())?,
            )
            .await?;

        let html = body_string(response).await?;
        assert!(html.contains("data-state=\"loading\""));
        assert!(html.contains("content=\"0;url=/confirm?token=bad-tok&amp;type=signup\""));
        // the retry page itself never verifies
        assert_eq!(provider.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn open_app_redirects_to_deep_link() -> anyhow::Result<()> {
        let response = router(Arc::new(FakeProvider::user(None)))
            .oneshot(Request::builder().uri("/open-app").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "tplatform://app/login"
        );
        Ok(())
    }

    #[tokio::test]
    async fn confirm_api_expired() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::new(|_| {
            Err(ProviderError::rejected(None, "Token expired"))
        }));
        let response = router(provider)
            .oneshot(
                Request::builder()
                    .uri("/v1/confirm?token=expired-tok")
                    .body(Body::empty())?,
            )
            .await?;

        let payload: serde_json::Value = serde_json::from_str(&body_string(response).await?)?;
        assert_eq!(payload["state"], "expired");
        assert_eq!(payload["presentation"]["primary_action"], "retry");
        assert!(payload["handoff"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn confirm_api_success_includes_handoff() -> anyhow::Result<()> {
        let provider = Arc::new(FakeProvider::user(Some("user@example.com")));
        let response = router(provider)
            .oneshot(
                Request::builder()
                    .uri("/v1/confirm?token=abc123&type=invite")
                    .body(Body::empty())?,
            )
            .await?;

        let payload: serde_json::Value = serde_json::from_str(&body_string(response).await?)?;
        assert_eq!(payload["state"], "success");
        assert_eq!(payload["user_email"], "user@example.com");
        assert_eq!(payload["handoff"]["deep_link"], "tplatform://app/login");
        assert_eq!(payload["handoff"]["fallback_after_ms"], 3000);
        Ok(())
    }
}
