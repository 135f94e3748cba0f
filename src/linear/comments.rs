use serde::Deserialize;
use serde_json::json;

use crate::client::LinearClient;
use crate::error::{LinearError, Result};
use crate::responses::Connection;
use crate::types::Comment;

const LIST_COMMENTS_QUERY: &str = r#"
query IssueComments($issueId: String!) {
    issue(id: $issueId) {
        comments {
            nodes {
                id
                body
                user {
                    id
                    name
                    displayName
                }
                createdAt
            }
        }
    }
}
"#;

#[derive(Deserialize)]
struct CommentsResponse {
    issue: Option<IssueWithComments>,
}

#[derive(Deserialize)]
struct IssueWithComments {
    comments: Connection<Comment>,
}

pub async fn list(
    client: &LinearClient,
    token: Option<&str>,
    issue_id: &str,
) -> Result<Vec<Comment>> {
    let response: CommentsResponse = client
        .query(LIST_COMMENTS_QUERY, Some(json!({ "issueId": issue_id })), token)
        .await?;

    Ok(response
        .issue
        .ok_or_else(|| LinearError::IssueNotFound(issue_id.to_string()))?
        .comments
        .nodes)
}
