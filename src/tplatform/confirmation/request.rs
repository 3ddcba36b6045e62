use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use url::form_urlencoded;
use utoipa::ToSchema;

pub const PARAM_TOKEN: &str = "token";
pub const PARAM_TYPE: &str = "type";

/// Read-only view of a page's query string.
///
/// Lookups return the first occurrence of a key, like `URLSearchParams.get`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Re-encode the parameters, keeping their order.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The category of action a confirmation token authorizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationType {
    #[default]
    Signup,
    Recovery,
    Invite,
    Magiclink,
}

impl ConfirmationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Recovery => "recovery",
            Self::Invite => "invite",
            Self::Magiclink => "magiclink",
        }
    }
}

impl fmt::Display for ConfirmationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised confirmation type {0}")]
pub struct UnsupportedType(pub String);

impl FromStr for ConfirmationType {
    type Err = UnsupportedType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(Self::Signup),
            "recovery" => Ok(Self::Recovery),
            "invite" => Ok(Self::Invite),
            "magiclink" => Ok(Self::Magiclink),
            other => Err(UnsupportedType(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("missing confirmation token")]
    MissingToken,
}

/// Token and type taken from the confirmation link. Immutable once built.
///
/// The type is kept as sent. Values outside [`ConfirmationType`] (for example
/// `email` or `email_change`) are still valid for the identity provider,
/// which is the one that decides whether the token is accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    token: String,
    kind: String,
}

impl ConfirmationRequest {
    /// Build the request from the page's query parameters.
    ///
    /// An empty `token` counts as missing, an empty `type` as omitted.
    ///
    /// # Errors
    /// Returns [`RequestError::MissingToken`] without a token.
    pub fn from_params(params: &QueryParams) -> Result<Self, RequestError> {
        let token = params
            .get(PARAM_TOKEN)
            .filter(|token| !token.is_empty())
            .ok_or(RequestError::MissingToken)?;

        let kind = params
            .get(PARAM_TYPE)
            .filter(|kind| !kind.is_empty())
            .unwrap_or(ConfirmationType::default().as_str());

        Ok(Self {
            token: token.to_string(),
            kind: kind.to_string(),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The `type` exactly as the link carried it.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// # Errors
    /// Returns [`UnsupportedType`] when the type is not one the app sends itself.
    pub fn known_kind(&self) -> Result<ConfirmationType, UnsupportedType> {
        self.kind.parse()
    }
}

// tokens are single-use credentials, keep them out of logs
impl fmt::Debug for ConfirmationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationRequest")
            .field("token", &"***")
            .field("kind", &self.kind)
            .finish()
    }
}
