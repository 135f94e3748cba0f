use serde::Deserialize;

use crate::client::LinearClient;
use crate::error::{LinearError, Result};
use crate::responses::Connection;
use crate::types::Team;

const LIST_TEAMS_QUERY: &str = r#"
query Teams {
    teams {
        nodes {
            id
            name
            key
        }
    }
}
"#;

#[derive(Deserialize)]
struct TeamsResponse {
    teams: Connection<Team>,
}

pub async fn list(client: &LinearClient, token: Option<&str>) -> Result<Vec<Team>> {
    let response: TeamsResponse = client.query(LIST_TEAMS_QUERY, None, token).await?;
    Ok(response.teams.nodes)
}

/// Resolve a team from its id or key.
pub async fn find(client: &LinearClient, token: Option<&str>, needle: &str) -> Result<Team> {
    list(client, token)
        .await?
        .into_iter()
        .find(|t| t.matches(needle))
        .ok_or_else(|| LinearError::TeamNotFound(needle.to_string()))
}
