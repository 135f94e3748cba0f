use tabled::Tabled;

use crate::client::LinearClient;
use crate::config::Config;
use crate::error::Result;
use crate::linear::{projects, teams};
use crate::output;
use crate::types::Project;

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Lead")]
    lead: String,
    #[tabled(rename = "Teams")]
    teams: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Project> for ProjectRow {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            lead: project
                .lead
                .as_ref()
                .map(|u| u.label().to_string())
                .unwrap_or_default(),
            teams: project
                .teams
                .nodes
                .iter()
                .map(|t| t.key.as_deref().unwrap_or(&t.name))
                .collect::<Vec<_>>()
                .join(", "),
            id: project.id.clone(),
        }
    }
}

pub async fn list(client: &LinearClient, config: &Config, team: Option<String>) -> Result<()> {
    let team_id = match config.resolve_team(team.as_deref()) {
        Some(needle) => Some(teams::find(client, None, &needle).await?.id),
        None => None,
    };

    let projects = projects::list(client, None, team_id.as_deref()).await?;
    output::print_table(&projects, |p| ProjectRow::from(p));

    Ok(())
}
