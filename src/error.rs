use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinearError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Transport { status: u16, message: String },

    #[error("GraphQL errors: {}", messages.join("; "))]
    GraphQL { messages: Vec<String> },

    #[error("Empty response from API")]
    EmptyResponse,

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error(
        "No API key found. Set LINEAR_API_KEY env var or add api_key to the linear-roadmap config.toml"
    )]
    MissingApiKey,

    #[error("Team not specified and no default_team in config")]
    NoTeam,

    #[error("Team not found: {0}")]
    TeamNotFound(String),

    #[error("Issue with ID {0} not found")]
    IssueNotFound(String),

    #[error("No valid fields to update")]
    NoUpdates,

    #[error("Access token rejected: {0}")]
    AuthInvalid(String),

    #[error("Linear API error: {0}")]
    CommentRejected(String),

    #[error("Issue update failed: {0}")]
    UpdateRejected(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Linear OAuth is not configured. Set LINEAR_CLIENT_ID and LINEAR_CLIENT_SECRET")]
    OAuthNotConfigured,

    #[error("Authentication error: {0}")]
    ProviderDenied(String),

    #[error("Invalid state parameter. Please try logging in again.")]
    StateMismatch,

    #[error("No authorization code received. Please try again.")]
    MissingAuthorizationCode,

    #[error("Error getting access token: {0}")]
    TokenExchangeFailed(String),
}

impl LinearError {
    /// Message safe to show to an end user.
    ///
    /// Diagnostic-only failures are logged in full where they occur and
    /// collapse to a generic retry hint here.
    pub fn user_message(&self) -> String {
        match self {
            Self::Json(_) => {
                "Error parsing response from Linear. Please try again.".to_string()
            }
            Self::Http(_) | Self::Io(_) => {
                "Could not reach Linear. Please try again.".to_string()
            }
            Self::AuthInvalid(_) => {
                "Your Linear session has expired. Please log in again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinearError>;
