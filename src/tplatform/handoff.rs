//! Hand control back to the native app through a deep link.
//!
//! Opening a custom scheme is best effort: the browser either switches to the
//! app or silently stays on the page, and nothing tells us which happened. The
//! plan therefore carries a fallback notice that the page shows once
//! `fallback_after` has elapsed and the page is still visible.

use serde::Serialize;
use std::time::Duration;
use url::Url;
use utoipa::ToSchema;

pub const LOGIN_PATH: &str = "login";
pub const FALLBACK_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanionApp {
    name: String,
    deep_link_base: Url,
}

impl CompanionApp {
    #[must_use]
    pub fn new(name: String, deep_link_base: Url) -> Self {
        Self {
            name,
            deep_link_base,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<deep-link-base>login`, no query parameters.
    #[must_use]
    pub fn login_link(&self) -> String {
        format!("{}{LOGIN_PATH}", self.deep_link_base)
    }

    #[must_use]
    pub fn handoff(&self) -> HandoffPlan {
        HandoffPlan {
            deep_link: self.login_link(),
            fallback_after_ms: u64::try_from(FALLBACK_DELAY.as_millis()).unwrap_or(u64::MAX),
            fallback_notice: format!(
                "If the app didn't open automatically, please open {} manually and try logging in.",
                self.name
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HandoffPlan {
    pub deep_link: String,
    pub fallback_after_ms: u64,
    pub fallback_notice: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_link_appends_path() {
        let app = CompanionApp::new(
            "TplatForm".to_string(),
            Url::parse("tplatform://app/").unwrap(),
        );
        assert_eq!(app.login_link(), "tplatform://app/login");
    }

    #[test]
    fn test_handoff_plan() {
        let app = CompanionApp::new(
            "TplatForm".to_string(),
            Url::parse("https://links.tplatform.app/open/").unwrap(),
        );
        let plan = app.handoff();
        assert_eq!(plan.deep_link, "https://links.tplatform.app/open/login");
        assert_eq!(plan.fallback_after_ms, 3000);
        assert!(plan.fallback_notice.contains("open TplatForm manually"));
    }
}
