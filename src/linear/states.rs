use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::LinearClient;
use crate::error::Result;
use crate::responses::Connection;
use crate::types::WorkflowState;
use crate::workflow;

const WORKFLOW_STATES_QUERY: &str = r#"
query WorkflowStates($teamId: String!) {
    team(id: $teamId) {
        states {
            nodes {
                id
                name
                color
                position
                type
            }
        }
    }
}
"#;

#[derive(Deserialize)]
struct TeamStatesResponse {
    team: Option<TeamStates>,
}

#[derive(Deserialize)]
struct TeamStates {
    states: Connection<WorkflowState>,
}

/// The team's workflow states in roadmap column order.
pub async fn for_team(
    client: &LinearClient,
    token: Option<&str>,
    team_id: &str,
) -> Result<Vec<WorkflowState>> {
    let response: TeamStatesResponse = client
        .query(WORKFLOW_STATES_QUERY, Some(json!({ "teamId": team_id })), token)
        .await?;

    let states = response.team.map(|t| t.states.nodes).unwrap_or_default();
    let sorted = workflow::classify_and_sort(states);
    debug!(
        team_id,
        order = ?sorted.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "Sorted workflow states"
    );
    Ok(sorted)
}
