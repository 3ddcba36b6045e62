use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MSG_MISSING_TOKEN: &str = "No confirmation token provided";
pub const MSG_EXPIRED: &str = "Confirmation link has expired";
pub const MSG_FAILED: &str = "Email confirmation failed";
pub const MSG_SUCCESS: &str = "Email confirmed successfully!";
pub const MSG_NO_USER: &str = "Confirmation failed - no user data received";
pub const MSG_UNEXPECTED: &str = "An unexpected error occurred";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationState {
    Loading,
    Success,
    Error,
    Expired,
}

impl ConfirmationState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// Outcome shown on the confirmation page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationResult {
    pub state: ConfirmationState,
    pub message: String,
    /// Only set on success; empty when the provider returned no email.
    pub user_email: Option<String>,
}

impl ConfirmationResult {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            state: ConfirmationState::Loading,
            message: String::new(),
            user_email: None,
        }
    }

    #[must_use]
    pub fn success(email: Option<String>) -> Self {
        Self {
            state: ConfirmationState::Success,
            message: MSG_SUCCESS.to_string(),
            user_email: Some(email.unwrap_or_default()),
        }
    }

    #[must_use]
    pub fn expired() -> Self {
        Self {
            state: ConfirmationState::Expired,
            message: MSG_EXPIRED.to_string(),
            user_email: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: ConfirmationState::Error,
            message: message.into(),
            user_email: None,
        }
    }

    /// Email to display, if the provider supplied a non-empty one.
    #[must_use]
    pub fn display_email(&self) -> Option<&str> {
        self.user_email.as_deref().filter(|email| !email.is_empty())
    }
}
