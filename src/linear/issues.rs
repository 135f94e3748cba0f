use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::client::LinearClient;
use crate::error::{LinearError, Result};
use crate::responses::{Connection, IssueRef};
use crate::types::{Comment, Issue, User, WorkflowState};
use crate::workflow;

const LIST_ISSUES_QUERY: &str = r#"
query Issues($filter: IssueFilter) {
    issues(filter: $filter) {
        nodes {
            id
            identifier
            title
            description
            state {
                id
                name
                color
            }
            assignee {
                id
                name
                displayName
            }
            createdAt
            updatedAt
        }
    }
}
"#;

const VERIFY_ISSUE_QUERY: &str = r#"
query VerifyIssue($id: String!) {
    issue(id: $id) {
        id
        identifier
        title
    }
}
"#;

const ISSUE_DETAIL_QUERY: &str = r#"
query Issue($id: String!) {
    issue(id: $id) {
        id
        identifier
        title
        description
        state {
            id
            name
            color
        }
        assignee {
            id
            name
            displayName
        }
        createdAt
        updatedAt
        team {
            id
            name
            key
            states {
                nodes {
                    id
                    name
                    color
                    position
                    type
                }
            }
            members {
                nodes {
                    id
                    name
                    displayName
                }
            }
        }
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
struct IssuesResponse {
    issues: Connection<Issue>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    issue: Option<IssueRef>,
}

#[derive(Deserialize)]
struct DetailResponse {
    issue: Option<DetailNode>,
}

#[derive(Deserialize)]
struct DetailNode {
    #[serde(flatten)]
    issue: Issue,
    team: Option<DetailTeam>,
    #[serde(default)]
    comments: Connection<Comment>,
}

#[derive(Deserialize)]
struct DetailTeam {
    #[serde(default)]
    states: Connection<WorkflowState>,
    #[serde(default)]
    members: Connection<User>,
}

/// An issue with everything the detail view needs.
#[derive(Serialize, Debug, Clone)]
pub struct IssueDetail {
    pub issue: Issue,
    pub team_members: Vec<User>,
    pub workflow_states: Vec<WorkflowState>,
    pub comments: Vec<Comment>,
}

/// Issues of a team, optionally narrowed to one project.
pub async fn list(
    client: &LinearClient,
    token: Option<&str>,
    team_id: &str,
    project_id: Option<&str>,
) -> Result<Vec<Issue>> {
    let mut filter = serde_json::Map::new();
    filter.insert("team".to_string(), json!({ "id": { "eq": team_id } }));
    if let Some(project_id) = project_id {
        filter.insert("project".to_string(), json!({ "id": { "eq": project_id } }));
    }

    let response: IssuesResponse = client
        .query(LIST_ISSUES_QUERY, Some(json!({ "filter": filter })), token)
        .await?;
    Ok(response.issues.nodes)
}

/// Confirm an issue exists and resolve its internal id.
///
/// Any failure of the lookup counts as "not found", except a rejected
/// caller token, which is returned as `AuthInvalid` so it can be refreshed.
pub async fn verify(client: &LinearClient, token: Option<&str>, id: &str) -> Result<IssueRef> {
    let response = match client
        .query::<VerifyResponse>(VERIFY_ISSUE_QUERY, Some(json!({ "id": id })), token)
        .await
    {
        Ok(response) => response,
        Err(e @ LinearError::AuthInvalid(_)) if token.is_some() => {
            warn!(issue_id = id, error = %e, "Caller token rejected during issue lookup");
            return Err(e);
        }
        Err(e) => {
            warn!(issue_id = id, error = %e, "Issue verification failed");
            return Err(LinearError::IssueNotFound(id.to_string()));
        }
    };

    response
        .issue
        .ok_or_else(|| LinearError::IssueNotFound(id.to_string()))
}

pub async fn detail(client: &LinearClient, token: Option<&str>, id: &str) -> Result<IssueDetail> {
    let response: DetailResponse = client
        .query(ISSUE_DETAIL_QUERY, Some(json!({ "id": id })), token)
        .await?;

    let node = response
        .issue
        .ok_or_else(|| LinearError::IssueNotFound(id.to_string()))?;
    let (states, members) = node
        .team
        .map(|t| (t.states.nodes, t.members.nodes))
        .unwrap_or_default();

    Ok(IssueDetail {
        issue: node.issue,
        team_members: members,
        workflow_states: workflow::classify_and_sort(states),
        comments: node.comments.nodes,
    })
}
