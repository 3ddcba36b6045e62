//! Collaborator doubles shared by the unit tests.

use crate::tplatform::{
    analytics::{AnalyticsEvent, AnalyticsSink},
    provider::{
        IdentityProvider, ProviderError, ProviderFuture, ProviderUser, VerifyOtpRequest,
        VerifyOtpResponse,
    },
};
use std::collections::HashSet;
use std::sync::Mutex;

type Responder =
    Box<dyn Fn(&VerifyOtpRequest) -> Result<VerifyOtpResponse, ProviderError> + Send + Sync>;

/// Provider double that treats tokens as single-use, like the real backend.
pub(crate) struct FakeProvider {
    pub calls: Mutex<Vec<VerifyOtpRequest>>,
    consumed: Mutex<HashSet<String>>,
    respond: Responder,
    healthy: bool,
}

impl FakeProvider {
    pub(crate) fn new(
        respond: impl Fn(&VerifyOtpRequest) -> Result<VerifyOtpResponse, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            consumed: Mutex::new(HashSet::new()),
            respond: Box::new(respond),
            healthy: true,
        }
    }

    pub(crate) fn user(email: Option<&str>) -> Self {
        let email = email.map(str::to_string);
        Self::new(move |_| {
            Ok(VerifyOtpResponse {
                user: Some(ProviderUser {
                    id: "u-1".to_string(),
                    email: email.clone(),
                }),
            })
        })
    }

    pub(crate) fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

impl IdentityProvider for FakeProvider {
    fn verify_otp<'a>(
        &'a self,
        request: &'a VerifyOtpRequest,
    ) -> ProviderFuture<'a, Result<VerifyOtpResponse, ProviderError>> {
        Box::pin(async move {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(request.clone());
            }

            let first_use = self
                .consumed
                .lock()
                .map(|mut consumed| consumed.insert(request.token_hash.clone()))
                .unwrap_or(true);

            if !first_use {
                return Err(ProviderError::rejected(
                    Some("otp_expired".to_string()),
                    "Email link is invalid or has expired",
                ));
            }

            (self.respond)(request)
        })
    }

    fn health(&self) -> ProviderFuture<'_, anyhow::Result<()>> {
        let healthy = self.healthy;
        Box::pin(async move {
            if healthy {
                Ok(())
            } else {
                Err(anyhow::anyhow!("provider unreachable"))
            }
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub(crate) fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
