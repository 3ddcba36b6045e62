use super::{
    request::{ConfirmationRequest, QueryParams, RequestError},
    result::{ConfirmationResult, MSG_FAILED, MSG_MISSING_TOKEN, MSG_NO_USER, MSG_UNEXPECTED},
};
use crate::tplatform::{
    analytics::{AnalyticsEvent, AnalyticsSink},
    provider::{IdentityProvider, ProviderError, VerifyOtpRequest},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Drives one token verification against the identity provider.
///
/// Built once at startup; the provider and analytics collaborators are
/// injected and shared by every request.
#[derive(Clone)]
pub struct ConfirmationFlow {
    provider: Arc<dyn IdentityProvider>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl ConfirmationFlow {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            provider,
            analytics,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// Resolve the query parameters of a confirmation link to a terminal result.
    ///
    /// At most one provider call is made. A missing token is rejected before
    /// any network traffic; the `type` is left for the provider to judge.
    #[instrument(skip_all)]
    pub async fn verify(&self, params: &QueryParams) -> ConfirmationResult {
        let request = match ConfirmationRequest::from_params(params) {
            Ok(request) => request,
            Err(RequestError::MissingToken) => {
                debug!("confirmation link without token");
                return ConfirmationResult::error(MSG_MISSING_TOKEN);
            }
        };

        self.confirm(&request).await
    }

    #[instrument(skip(self), fields(confirmation.type = %request.kind()))]
    pub async fn confirm(&self, request: &ConfirmationRequest) -> ConfirmationResult {
        if let Err(e) = request.known_kind() {
            debug!("{}, forwarding to the identity provider", e);
        }

        let otp = VerifyOtpRequest {
            kind: request.kind().to_string(),
            token_hash: request.token().to_string(),
        };

        match self.provider.verify_otp(&otp).await {
            Ok(response) => {
                let Some(user) = response.user else {
                    error!("Identity provider reported success without user data");
                    return ConfirmationResult::error(MSG_NO_USER);
                };

                info!(user_id = %user.id, "email confirmed");

                let email = user.email.unwrap_or_default();
                self.analytics
                    .track(AnalyticsEvent::email_confirmed(&user.id, &email));

                ConfirmationResult::success(Some(email))
            }

            Err(e @ ProviderError::Rejected { .. }) if e.is_expired() => {
                info!("Confirmation rejected, token expired: {}", e);
                ConfirmationResult::expired()
            }

            Err(ProviderError::Rejected { message, .. }) => {
                info!("Confirmation rejected: {}", message);
                if message.is_empty() {
                    ConfirmationResult::error(MSG_FAILED)
                } else {
                    ConfirmationResult::error(message)
                }
            }

            Err(e) => {
                error!("Confirmation error: {:?}", e);
                ConfirmationResult::error(MSG_UNEXPECTED)
            }
        }
    }
}

impl std::fmt::Debug for ConfirmationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationFlow").finish_non_exhaustive()
    }
}
