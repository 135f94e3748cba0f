use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::error::{LinearError, Result};
use crate::responses::{GraphQLError, GraphQLResponse};

pub const API_ENDPOINT: &str = "https://api.linear.app/graphql";

/// Prefix Linear uses for personal API keys, which are sent without `Bearer`.
const PERSONAL_KEY_PREFIX: &str = "lin_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    OAuthToken,
    PersonalKey,
    BearerKey,
    Anonymous,
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthKind::OAuthToken => "oauth token",
            AuthKind::PersonalKey => "personal API key",
            AuthKind::BearerKey => "bearer API key",
            AuthKind::Anonymous => "none",
        };
        write!(f, "{label}")
    }
}

/// Authorization header chosen for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub kind: AuthKind,
    pub header: Option<String>,
    credential: Option<String>,
}

impl Authorization {
    fn masked(&self) -> String {
        self.credential
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "-".to_string())
    }
}

/// GraphQL client for the Linear API.
///
/// The process-level API key is fixed at construction. A caller token passed
/// to [`LinearClient::execute`] takes precedence for that request only.
#[derive(Clone)]
pub struct LinearClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl LinearClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: API_ENDPOINT.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Point the client at another GraphQL endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Shared HTTP connection pool, also used for the OAuth token endpoint.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn authorization(&self, token: Option<&str>) -> Authorization {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => Authorization {
                kind: AuthKind::OAuthToken,
                header: Some(format!("Bearer {token}")),
                credential: Some(token.to_string()),
            },
            None => self.api_key_authorization(),
        }
    }

    fn api_key_authorization(&self) -> Authorization {
        match self.api_key.as_deref() {
            Some(key) if key.starts_with(PERSONAL_KEY_PREFIX) => Authorization {
                kind: AuthKind::PersonalKey,
                header: Some(key.to_string()),
                credential: Some(key.to_string()),
            },
            Some(key) => Authorization {
                kind: AuthKind::BearerKey,
                header: Some(format!("Bearer {key}")),
                credential: Some(key.to_string()),
            },
            None => Authorization {
                kind: AuthKind::Anonymous,
                header: None,
                credential: None,
            },
        }
    }

    /// Run a query and hand back the raw envelope, GraphQL errors included.
    ///
    /// Only transport problems (network, timeout, non-2xx) are `Err`.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<Value>,
        token: Option<&str>,
    ) -> Result<GraphQLResponse> {
        let body = json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| json!({})),
        });
        self.post(query, &body, self.authorization(token)).await
    }

    /// Post a query with no `variables` member, authenticated by the API key.
    pub async fn execute_raw(&self, query: &str) -> Result<GraphQLResponse> {
        let body = json!({ "query": query });
        self.post(query, &body, self.api_key_authorization()).await
    }

    /// Typed convenience: GraphQL errors and missing data become `Err`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
        token: Option<&str>,
    ) -> Result<T> {
        let response = self.execute(query, variables, token).await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let auth_invalid = errors.iter().any(GraphQLError::is_auth_invalid);
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            if auth_invalid {
                return Err(LinearError::AuthInvalid(messages.join("; ")));
            }
            return Err(LinearError::GraphQL { messages });
        }

        let data = response.data.ok_or(LinearError::EmptyResponse)?;
        Ok(serde_json::from_value(data)?)
    }

    async fn post(
        &self,
        query: &str,
        body: &Value,
        auth: Authorization,
    ) -> Result<GraphQLResponse> {
        let operation = operation_name(query);
        if auth.kind == AuthKind::Anonymous {
            warn!(operation, "No Linear credentials configured, sending unauthenticated request");
        }
        info!(
            operation,
            auth = %auth.kind,
            credential = %auth.masked(),
            "Executing Linear API request"
        );

        let mut request = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(value) = &auth.header {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.inspect_err(|e| {
            error!(operation, error = %e, "Linear API request failed");
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            error!(
                operation,
                status = status.as_u16(),
                auth = %auth.kind,
                credential = %auth.masked(),
                "Linear API error: {message}"
            );
            return Err(LinearError::Transport {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: GraphQLResponse = response.json().await?;
        if let Some(detail) = envelope.error_detail() {
            debug!(operation, "GraphQL errors: {detail}");
        }
        Ok(envelope)
    }
}

/// Name of the first operation in a GraphQL document, for logging.
pub fn operation_name(query: &str) -> &str {
    let mut words = query.split_whitespace();
    match words.next() {
        Some("query") | Some("mutation") => words
            .next()
            .map(|w| w.split(['(', '{']).next().unwrap_or(w))
            .filter(|w| !w.is_empty())
            .unwrap_or("anonymous"),
        _ => "anonymous",
    }
}

/// Keep enough of a credential to recognise it in logs.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    if secret.chars().count() > 5 {
        format!("{prefix}...")
    } else {
        "***".to_string()
    }
}
