//! Three-legged OAuth against Linear.
//!
//! The flow moves a session from anonymous, to awaiting the provider
//! callback (a pending `state` token is stored), to authenticated (identity and
//! tokens are stored). Logout clears the session again.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use url::Url;

use crate::client::{mask_secret, LinearClient};
use crate::config::Config;
use crate::error::{LinearError, Result};
use crate::linear;
use crate::session::{random_token, SessionRecord, SessionUser};
use crate::types::Viewer;

pub const AUTHORIZE_URL: &str = "https://linear.app/oauth/authorize";
pub const TOKEN_URL: &str = "https://api.linear.app/oauth/token";
pub const SCOPES: &str = "issues:write,comments:write,read";
const STATE_BYTES: usize = 16;
const MALFORMED_TOKEN_RESPONSE: &str = "Malformed response from the token endpoint";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(LinearError::OAuthNotConfigured),
        }
    }
}

/// Tokens issued by the token endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Query parameters Linear appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Exchanges a refresh token for a new token pair.
///
/// Failures yield `None`; callers fall back to API-key auth.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Option<TokenPair>;
}

pub struct OAuthManager {
    client: LinearClient,
    config: OAuthConfig,
}

impl OAuthManager {
    pub fn new(client: LinearClient, config: OAuthConfig) -> Self {
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.credentials().is_ok()
    }

    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Start a login: store a fresh state token and build the consent URL.
    pub fn begin_login(&self, session: &mut SessionRecord) -> Result<Url> {
        let (client_id, _) = self.config.credentials()?;
        let state = random_token(STATE_BYTES);

        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", SCOPES),
                ("state", state.as_str()),
                ("response_type", "code"),
            ],
        )
        .map_err(|e| LinearError::InvalidUrl(format!("{}: {e}", self.config.authorize_url)))?;

        info!(redirect_uri = %self.config.redirect_uri, "Initiating OAuth flow");
        session.oauth_state = Some(state);
        Ok(url)
    }

    /// Finish a login from the provider's callback.
    ///
    /// The pending state is consumed whatever the outcome, so a failed
    /// callback leaves the session anonymous.
    pub async fn handle_callback(
        &self,
        session: &mut SessionRecord,
        params: CallbackParams,
    ) -> Result<Viewer> {
        let expected = session.oauth_state.take();

        if let Some(error) = params.error {
            let description = params.error_description.unwrap_or(error);
            error!("OAuth error from provider: {description}");
            return Err(LinearError::ProviderDenied(description));
        }

        match (params.state.as_deref(), expected.as_deref()) {
            (Some(got), Some(want)) if got == want => {}
            (got, want) => {
                error!(
                    got = got.unwrap_or("-"),
                    expected = want.unwrap_or("-"),
                    "Invalid OAuth state parameter"
                );
                return Err(LinearError::StateMismatch);
            }
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(LinearError::MissingAuthorizationCode)?;

        let tokens = self.exchange_code(&code).await?;

        let token = Some(tokens.access_token.as_str());
        let identity = match linear::viewer::fetch(&self.client, token).await {
            Ok(viewer) => viewer,
            Err(e) => {
                warn!(error = %e, "Could not fetch user info after login");
                Viewer::unknown()
            }
        };

        info!(user = %identity.name, "OAuth login complete");
        session.user = Some(SessionUser {
            identity: identity.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        });
        session.touch(Utc::now());
        Ok(identity)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair> {
        let (client_id, client_secret) = self.config.credentials()?;
        let payload = json!({
            "client_id": client_id,
            "client_secret": client_secret,
            "redirect_uri": self.config.redirect_uri,
            "code": code,
            "grant_type": "authorization_code",
        });
        info!(client_id = %mask_secret(client_id), "Exchanging auth code for token");
        self.post_token(&payload).await
    }

    async fn post_token(&self, payload: &Value) -> Result<TokenPair> {
        let response = self
            .client
            .http()
            .post(&self.config.token_url)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            error!(status = status.as_u16(), body = %body, "Failed to parse token response as JSON: {e}");
            LinearError::TokenExchangeFailed(MALFORMED_TOKEN_RESPONSE.to_string())
        })?;

        if !status.is_success() || value.get("error").is_some() {
            let description = value
                .get("error_description")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            error!(status = status.as_u16(), "Error getting access token: {description}");
            return Err(LinearError::TokenExchangeFailed(description));
        }

        serde_json::from_value(value).map_err(|e| {
            error!(body = %body, "Token response missing fields: {e}");
            LinearError::TokenExchangeFailed(MALFORMED_TOKEN_RESPONSE.to_string())
        })
    }

    pub fn logout(&self, session: &mut SessionRecord) {
        if let Some(user) = &session.user {
            info!(user = %user.identity.name, "Logging out");
        }
        session.clear();
    }
}

#[async_trait]
impl TokenRefresher for OAuthManager {
    async fn refresh(&self, refresh_token: &str) -> Option<TokenPair> {
        let (client_id, client_secret) = self.config.credentials().ok()?;
        let payload = json!({
            "client_id": client_id,
            "client_secret": client_secret,
            "refresh_token": refresh_token,
            "grant_type": "refresh_token",
        });

        match self.post_token(&payload).await {
            Ok(tokens) => {
                info!("Refreshed OAuth access token");
                Some(tokens)
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh token");
                None
            }
        }
    }
}
