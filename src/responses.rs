//! Shared GraphQL response types.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static AUTH_INVALID_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)invalid[_ ]?token|token (has )?expired|not authenticated")
        .expect("auth error pattern is valid")
});

/// Top-level GraphQL envelope. `errors` may accompany or replace `data`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct GraphQLResponse {
    pub data: Option<Value>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GraphQLError {
    #[serde(default = "unknown_error")]
    pub message: String,
    pub extensions: Option<Value>,
}

fn unknown_error() -> String {
    "Unknown error".to_string()
}

impl GraphQLResponse {
    /// Error messages joined the way they are shown to users.
    pub fn error_detail(&self) -> Option<String> {
        self.errors
            .as_ref()
            .filter(|e| !e.is_empty())
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ")
            })
    }

    /// Look up a field under `data`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref()?.get(name).filter(|v| !v.is_null())
    }

    /// Whether `data.<mutation>.success` is true.
    pub fn mutation_succeeded(&self, mutation: &str) -> bool {
        self.field(mutation)
            .and_then(|m| m.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl GraphQLError {
    fn extension_str(&self, key: &str) -> Option<&str> {
        self.extensions.as_ref()?.get(key)?.as_str()
    }

    /// Whether this error says the bearer token was rejected.
    pub fn is_auth_invalid(&self) -> bool {
        if AUTH_INVALID_MESSAGE.is_match(&self.message) {
            return true;
        }
        matches!(
            self.extension_str("code"),
            Some("AUTHENTICATION_ERROR") | Some("INVALID_TOKEN")
        ) || self
            .extension_str("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("authentication error"))
    }

    pub fn is_permission_error(&self) -> bool {
        self.message.to_uppercase().contains("PERMISSION")
            || self
                .extension_str("type")
                .is_some_and(|t| t.to_uppercase().contains("NOT_AUTHORIZED"))
    }
}

/// Generic `{ nodes: [...] }` connection.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Connection<T> {
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

/// Minimal issue info returned by existence checks and mutations.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IssueRef {
    pub id: String,
    pub identifier: String,
    pub title: String,
}
