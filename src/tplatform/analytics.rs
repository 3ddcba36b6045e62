//! Fire-and-forget analytics.
//!
//! Sinks never report errors back to the caller: a confirmation that succeeded
//! stays successful whatever happens to the event.

use crate::APP_USER_AGENT;
use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{Instrument, info, info_span, warn};
use url::Url;

/// Upper bound for one collector delivery, connect included.
pub const COLLECTOR_TIMEOUT: Duration = Duration::from_secs(5);

pub const EVENT_EMAIL_CONFIRMED: &str = "email_confirmed";
pub const CATEGORY_AUTHENTICATION: &str = "authentication";
pub const LABEL_EMAIL_VERIFICATION_SUCCESS: &str = "email_verification_success";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub event: String,
    pub category: String,
    pub label: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

impl AnalyticsEvent {
    #[must_use]
    pub fn email_confirmed(user_id: &str, email: &str) -> Self {
        Self {
            event: EVENT_EMAIL_CONFIRMED.to_string(),
            category: CATEGORY_AUTHENTICATION.to_string(),
            label: Some(LABEL_EMAIL_VERIFICATION_SUCCESS.to_string()),
            user_id: Some(user_id.to_string()),
            email: Some(email.to_string()),
        }
    }
}

pub trait AnalyticsSink: Send + Sync {
    /// Record an event without waiting for delivery.
    fn track(&self, event: AnalyticsEvent);
}

/// Default sink, records events in the service log.
#[derive(Clone, Debug)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        info!(
            event = %event.event,
            category = %event.category,
            label = event.label.as_deref().unwrap_or_default(),
            user_id = event.user_id.as_deref().unwrap_or_default(),
            "analytics event"
        );
    }
}

/// Posts events as JSON to a collector endpoint on a spawned task.
///
/// Each delivery is bounded by the client timeout so a collector that stops
/// answering cannot pile up tasks.
#[derive(Clone, Debug)]
pub struct HttpAnalytics {
    client: Client,
    endpoint: Url,
}

impl HttpAnalytics {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_timeout(endpoint, COLLECTOR_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    async fn deliver(&self, event: &AnalyticsEvent) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(event)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("collector rejected event: {}", response.status());
        }

        Ok(())
    }
}

impl AnalyticsSink for HttpAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        let sink = self.clone();
        let span = info_span!("analytics.track", event = %event.event);

        // requires a tokio runtime; handlers always run inside one
        tokio::spawn(
            async move {
                if let Err(e) = sink.deliver(&event).await {
                    warn!("Error sending analytics event: {}", e);
                }
            }
            .instrument(span),
        );
    }
}
