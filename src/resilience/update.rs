use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::CallerAuth;
use crate::client::LinearClient;
use crate::error::{LinearError, Result};
use crate::linear::issues;
use crate::responses::IssueRef;

const UPDATE_ISSUE_MUTATION: &str = r#"
mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
    issueUpdate(id: $id, input: $input) {
        success
        issue {
            id
            identifier
            title
        }
    }
}
"#;

/// Requested changes to an issue. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IssueUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "stateId", default)]
    pub state_id: Option<String>,
    /// `Some(None)` unassigns the issue.
    #[serde(rename = "assigneeId", default, deserialize_with = "assignee_field")]
    pub assignee_id: Option<Option<String>>,
}

/// A present `assigneeId` is always an instruction: null or "" clears it.
fn assignee_field<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|id| !id.is_empty())))
}

impl IssueUpdate {
    /// `IssueUpdateInput` built from the fields that were provided.
    pub fn payload(&self) -> Map<String, Value> {
        let mut input = Map::new();
        if let Some(title) = &self.title {
            input.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &self.description {
            input.insert("description".to_string(), json!(description));
        }
        if let Some(state_id) = &self.state_id {
            input.insert("stateId".to_string(), json!(state_id));
        }
        if let Some(assignee) = &self.assignee_id {
            let value = assignee
                .as_deref()
                .filter(|id| !id.is_empty())
                .map_or(Value::Null, |id| json!(id));
            input.insert("assigneeId".to_string(), value);
        }
        input
    }

    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }
}

/// Apply an update in a single mutation after confirming the issue exists.
pub async fn update_issue(
    client: &LinearClient,
    auth: &CallerAuth,
    issue_id: &str,
    update: &IssueUpdate,
) -> Result<IssueRef> {
    let input = update.payload();
    if input.is_empty() {
        return Err(LinearError::NoUpdates);
    }

    let issue = issues::verify(client, auth.token(), issue_id).await?;
    let fields: Vec<&str> = input.keys().map(String::as_str).collect();
    info!(issue = %issue.identifier, ?fields, "Updating issue");

    let variables = json!({ "id": issue.id, "input": input });
    let response = client
        .execute(UPDATE_ISSUE_MUTATION, Some(variables), auth.token())
        .await?;

    if let Some(detail) = response.error_detail() {
        warn!(issue = %issue.identifier, "Issue update rejected: {detail}");
        return Err(LinearError::UpdateRejected(detail));
    }
    if !response.mutation_succeeded("issueUpdate") {
        return Err(LinearError::UpdateRejected(
            "Linear reported the update as unsuccessful".to_string(),
        ));
    }

    let updated = response
        .field("issueUpdate")
        .and_then(|u| u.get("issue"))
        .cloned()
        .and_then(|v| serde_json::from_value::<IssueRef>(v).ok())
        .unwrap_or(issue);
    Ok(updated)
}
