use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::CallerAuth;
use crate::client::LinearClient;
use crate::error::{LinearError, Result};
use crate::linear::issues;
use crate::oauth::TokenRefresher;
use crate::responses::{GraphQLResponse, IssueRef};

const INLINE_MUTATION: &str = r#"
mutation AddCommentInline($issueId: String!, $body: String!) {
    commentCreate(input: { issueId: $issueId, body: $body }) {
        success
        comment {
            id
            body
            createdAt
        }
    }
}
"#;

const INPUT_OBJECT_MUTATION: &str = r#"
mutation AddCommentWithInput($input: CommentCreateInput!) {
    commentCreate(input: $input) {
        success
        comment {
            id
            body
            createdAt
        }
    }
}
"#;

/// Request shapes tried in order until one is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentShape {
    /// `commentCreate(input: { issueId: $issueId, body: $body })`
    Inline,
    /// `commentCreate(input: $input)` with a `CommentCreateInput` variable
    InputObject,
    /// Values interpolated into the document, no variables, API key auth
    Raw,
}

pub const COMMENT_CHAIN: [CommentShape; 3] =
    [CommentShape::Inline, CommentShape::InputObject, CommentShape::Raw];

impl fmt::Display for CommentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommentShape::Inline => "inline arguments",
            CommentShape::InputObject => "input object",
            CommentShape::Raw => "raw request",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedComment {
    pub id: Option<String>,
    pub body: Option<String>,
    pub shape: CommentShape,
}

/// Why one attempt did not produce a comment.
struct Failure {
    detail: String,
    auth_invalid: bool,
}

/// Escape text for use inside a double-quoted GraphQL string literal.
pub fn escape_graphql_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn raw_mutation(issue_id: &str, body: &str) -> String {
    format!(
        r#"
mutation AddCommentRaw {{
    commentCreate(input: {{ issueId: "{}", body: "{}" }}) {{
        success
        comment {{
            id
            body
            createdAt
        }}
    }}
}}
"#,
        escape_graphql_string(issue_id),
        escape_graphql_string(body)
    )
}

fn evaluate(shape: CommentShape, result: Result<GraphQLResponse>) -> std::result::Result<CreatedComment, Failure> {
    let response = result.map_err(|e| Failure {
        detail: e.to_string(),
        auth_invalid: false,
    })?;

    if response.mutation_succeeded("commentCreate") {
        let comment = response.field("commentCreate").and_then(|c| c.get("comment"));
        let text = |key: &str| {
            comment
                .and_then(|c| c.get(key))
                .and_then(Value::as_str)
                .map(String::from)
        };
        return Ok(CreatedComment {
            id: text("id"),
            body: text("body"),
            shape,
        });
    }

    let errors = response.errors.as_deref().unwrap_or_default();
    for error in errors {
        if error.is_permission_error() {
            warn!("Comment rejected for lack of permission: {}", error.message);
        }
    }
    Err(Failure {
        detail: response
            .error_detail()
            .unwrap_or_else(|| "Failed to create comment".to_string()),
        auth_invalid: errors.iter().any(|e| e.is_auth_invalid()),
    })
}

/// State carried across the attempts of one `add_comment` call.
struct CommentAttempts<'a> {
    client: &'a LinearClient,
    refresher: &'a dyn TokenRefresher,
    auth: &'a mut CallerAuth,
    /// Set once the caller's token has been given up on.
    use_api_key: bool,
    /// A call refreshes the caller's token at most once.
    refreshed: bool,
}

impl CommentAttempts<'_> {
    fn token(&self) -> Option<String> {
        if self.use_api_key {
            None
        } else {
            self.auth.access_token.clone()
        }
    }

    async fn refresh_once(&mut self) -> bool {
        if self.refreshed {
            return false;
        }
        self.refreshed = true;

        let Some(refresh_token) = self.auth.refresh_token.clone() else {
            return false;
        };
        info!("Token appears invalid, attempting to refresh");
        match self.refresher.refresh(&refresh_token).await {
            Some(tokens) => {
                self.auth.apply(tokens);
                true
            }
            None => false,
        }
    }

    /// Look the issue up, recovering from a rejected caller token the same
    /// way a rejected mutation does.
    async fn verify(&mut self, issue_id: &str) -> Result<IssueRef> {
        let token = self.token();
        match issues::verify(self.client, token.as_deref(), issue_id).await {
            Err(LinearError::AuthInvalid(detail)) => warn!("Caller token rejected: {detail}"),
            other => return other,
        }

        if self.refresh_once().await {
            info!("Retrying issue lookup with refreshed token");
            let token = self.token();
            match issues::verify(self.client, token.as_deref(), issue_id).await {
                Err(LinearError::AuthInvalid(detail)) => {
                    warn!("Still failing after token refresh: {detail}")
                }
                other => return other,
            }
        }

        info!("Falling back to API key");
        self.use_api_key = true;
        issues::verify(self.client, None, issue_id).await
    }

    async fn send(
        &self,
        shape: CommentShape,
        issue_id: &str,
        body: &str,
        token: Option<&str>,
    ) -> Result<GraphQLResponse> {
        match shape {
            CommentShape::Inline => {
                let variables = json!({ "issueId": issue_id, "body": body });
                self.client.execute(INLINE_MUTATION, Some(variables), token).await
            }
            CommentShape::InputObject => {
                let variables = json!({ "input": { "issueId": issue_id, "body": body } });
                self.client
                    .execute(INPUT_OBJECT_MUTATION, Some(variables), token)
                    .await
            }
            CommentShape::Raw => self.client.execute_raw(&raw_mutation(issue_id, body)).await,
        }
    }

    async fn attempt(
        &mut self,
        shape: CommentShape,
        issue_id: &str,
        body: &str,
    ) -> std::result::Result<CreatedComment, Failure> {
        let token = self.token();
        let first = evaluate(shape, self.send(shape, issue_id, body, token.as_deref()).await);

        // Only the first shape, and only a rejected caller token, earns a retry
        let failure = match first {
            Err(failure) if shape == CommentShape::Inline && failure.auth_invalid && token.is_some() => {
                failure
            }
            other => return other,
        };
        warn!("Caller token rejected: {}", failure.detail);

        if self.refresh_once().await {
            info!("Retrying with refreshed token");
            let token = self.token();
            match evaluate(shape, self.send(shape, issue_id, body, token.as_deref()).await) {
                Ok(created) => return Ok(created),
                Err(failure) => warn!("Still failing after token refresh: {}", failure.detail),
            }
        }

        info!("Falling back to API key");
        self.use_api_key = true;
        evaluate(shape, self.send(shape, issue_id, body, None).await)
    }
}

/// Add a comment, walking [`COMMENT_CHAIN`] until a shape is accepted.
///
/// The issue is looked up first; if it can't be found nothing is sent. Any
/// refreshed tokens are left in `auth` for the caller to persist.
pub async fn add_comment(
    client: &LinearClient,
    refresher: &dyn TokenRefresher,
    auth: &mut CallerAuth,
    issue_id: &str,
    body: &str,
) -> Result<CreatedComment> {
    let mut attempts = CommentAttempts {
        client,
        refresher,
        auth,
        use_api_key: false,
        refreshed: false,
    };

    let issue = attempts.verify(issue_id).await?;
    info!(issue = %issue.identifier, "Adding comment");

    let mut last_error = String::new();
    for shape in COMMENT_CHAIN {
        match attempts.attempt(shape, &issue.id, body).await {
            Ok(created) => {
                info!(issue = %issue.identifier, %shape, "Comment created");
                return Ok(created);
            }
            Err(failure) => {
                warn!(issue = %issue.identifier, %shape, "Comment attempt failed: {}", failure.detail);
                last_error = failure.detail;
            }
        }
    }

    Err(LinearError::CommentRejected(last_error))
}
