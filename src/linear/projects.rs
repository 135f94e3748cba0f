use serde::Deserialize;

use crate::client::LinearClient;
use crate::error::Result;
use crate::responses::Connection;
use crate::types::Project;

const LIST_PROJECTS_QUERY: &str = r#"
query Projects {
    projects {
        nodes {
            id
            name
            lead {
                id
                name
            }
            teams {
                nodes {
                    id
                    name
                }
            }
        }
    }
}
"#;

#[derive(Deserialize)]
struct ProjectsResponse {
    projects: Connection<Project>,
}

/// All projects, or only those the given team participates in.
pub async fn list(
    client: &LinearClient,
    token: Option<&str>,
    team_id: Option<&str>,
) -> Result<Vec<Project>> {
    let response: ProjectsResponse = client.query(LIST_PROJECTS_QUERY, None, token).await?;
    Ok(filter_by_team(response.projects.nodes, team_id))
}

fn filter_by_team(projects: Vec<Project>, team_id: Option<&str>) -> Vec<Project> {
    match team_id {
        Some(team_id) => projects
            .into_iter()
            .filter(|p| p.belongs_to(team_id))
            .collect(),
        None => projects,
    }
}
