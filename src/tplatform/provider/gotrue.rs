use super::{
    IdentityProvider, ProviderError, ProviderFuture, ProviderUser, VerifyOtpRequest,
    VerifyOtpResponse,
};
use crate::APP_USER_AGENT;
use anyhow::{Result, anyhow};
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

const VERIFY_PATH: &str = "auth/v1/verify";
const HEALTH_PATH: &str = "auth/v1/health";

/// Supabase / `GoTrue` auth backend, authenticated with the project's anon key.
///
/// The underlying HTTP client is built once and shared by every request.
#[derive(Clone)]
pub struct GoTrue {
    client: Client,
    verify_url: Url,
    health_url: Url,
    anon_key: SecretString,
}

impl GoTrue {
    /// # Errors
    /// Returns an error if the base URL cannot be extended or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &Url, anon_key: SecretString) -> Result<Self> {
        // keep any path prefix of the base URL
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            verify_url: base.join(VERIFY_PATH)?,
            health_url: base.join(HEALTH_PATH)?,
            anon_key,
        })
    }

    #[instrument(skip(self))]
    async fn post_verify(
        &self,
        request: &VerifyOtpRequest,
    ) -> Result<VerifyOtpResponse, ProviderError> {
        let anon_key = self.anon_key.expose_secret();

        let response = self
            .client
            .post(self.verify_url.as_str())
            .header("apikey", anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {anon_key}"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        debug!("verify response status: {}", status);

        if !status.is_success() {
            let json_response: Value = serde_json::from_slice(&body).map_err(|e| {
                ProviderError::Malformed(format!("{status}, undecodable error body: {e}"))
            })?;

            return Err(ProviderError::rejected(
                error_code(&json_response),
                error_message(&json_response),
            ));
        }

        let json_response: Value = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::Malformed(format!("undecodable body: {e}")))?;

        Ok(VerifyOtpResponse {
            user: extract_user(&json_response),
        })
    }

    #[instrument(skip(self))]
    async fn get_health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.health_url.as_str())
            .header("apikey", self.anon_key.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("{} - {}", self.health_url, response.status()));
        }

        Ok(())
    }
}

impl IdentityProvider for GoTrue {
    fn verify_otp<'a>(
        &'a self,
        request: &'a VerifyOtpRequest,
    ) -> ProviderFuture<'a, Result<VerifyOtpResponse, ProviderError>> {
        Box::pin(self.post_verify(request))
    }

    fn health(&self) -> ProviderFuture<'_, Result<()>> {
        Box::pin(self.get_health())
    }
}

impl std::fmt::Debug for GoTrue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrue")
            .field("verify_url", &self.verify_url.as_str())
            .field("health_url", &self.health_url.as_str())
            .field("anon_key", &"***")
            .finish()
    }
}

/// A session response nests the user under `user`; some flows return the bare
/// user object instead.
fn extract_user(json_response: &Value) -> Option<ProviderUser> {
    let user = match json_response.get("user") {
        Some(user) if user.is_object() => user,
        _ if json_response.get("id").is_some() => json_response,
        _ => return None,
    };

    let id = user["id"].as_str()?;

    Some(ProviderUser {
        id: id.to_string(),
        email: user["email"].as_str().map(str::to_string),
    })
}

fn error_code(json_response: &Value) -> Option<String> {
    json_response["error_code"].as_str().map(str::to_string)
}

fn error_message(json_response: &Value) -> String {
    ["msg", "message", "error_description", "error"]
        .iter()
        .filter_map(|key| json_response[*key].as_str())
        .find(|message| !message.is_empty())
        .unwrap_or_default()
        .to_string()
}
