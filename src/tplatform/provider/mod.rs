//! Identity provider seam.
//!
//! The confirmation flow only needs two things from the hosted auth backend:
//! exchange a one-time token for a user, and report whether it is reachable.
//! [`GoTrue`] talks to a Supabase/`GoTrue` compatible backend over HTTP; tests
//! substitute their own implementation.

use serde::Serialize;
use std::{fmt, future::Future, pin::Pin};
use thiserror::Error;

mod gotrue;
pub use self::gotrue::GoTrue;

/// Structured error code the provider uses for expired one-time tokens.
pub const CODE_OTP_EXPIRED: &str = "otp_expired";

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Body of the verification call. `kind` is passed through untouched.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct VerifyOtpRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub token_hash: String,
}

impl fmt::Debug for VerifyOtpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyOtpRequest")
            .field("kind", &self.kind)
            .field("token_hash", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerifyOtpResponse {
    pub user: Option<ProviderUser>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered and refused the token.
    #[error("{message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed identity provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    #[must_use]
    pub fn rejected(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Whether the provider reported the token as expired.
    ///
    /// The structured code is checked first; the message substring is kept for
    /// backends that only describe expiry in text.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self {
            Self::Rejected { code, message } => {
                code.as_deref() == Some(CODE_OTP_EXPIRED) || message.contains("expired")
            }
            Self::Transport(_) | Self::Malformed(_) => false,
        }
    }
}

/// Hosted authentication backend.
pub trait IdentityProvider: Send + Sync {
    /// Exchange a one-time token. Implementations must not retry.
    fn verify_otp<'a>(
        &'a self,
        request: &'a VerifyOtpRequest,
    ) -> ProviderFuture<'a, Result<VerifyOtpResponse, ProviderError>>;

    /// Cheap reachability check used by `/health`.
    fn health(&self) -> ProviderFuture<'_, anyhow::Result<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_by_code() {
        let err = ProviderError::rejected(
            Some(CODE_OTP_EXPIRED.to_string()),
            "Email link is invalid",
        );
        assert!(err.is_expired());
    }

    #[test]
    fn test_expired_by_message() {
        assert!(ProviderError::rejected(None, "Token expired").is_expired());
        // provider wording is matched case-sensitively
        assert!(!ProviderError::rejected(None, "Token EXPIRED").is_expired());
    }

    #[test]
    fn test_other_rejections_are_not_expired() {
        assert!(!ProviderError::rejected(None, "Invalid signature").is_expired());
        assert!(!ProviderError::Malformed("expired".to_string()).is_expired());
    }

    #[test]
    fn test_rejected_displays_provider_message() {
        let err = ProviderError::rejected(None, "Invalid signature");
        assert_eq!(err.to_string(), "Invalid signature");
    }

    #[test]
    fn test_request_serializes_type_and_token_hash() {
        let request = VerifyOtpRequest {
            kind: "recovery".to_string(),
            token_hash: "abc123".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"type": "recovery", "token_hash": "abc123"}));
        assert!(!format!("{request:?}").contains("abc123"));
    }
}
