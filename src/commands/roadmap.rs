use colored::Colorize;
use serde::Serialize;

use crate::client::LinearClient;
use crate::config::Config;
use crate::error::{LinearError, Result};
use crate::linear::{issues, states, teams};
use crate::output::{self, status_colored, truncate};
use crate::types::Team;
use crate::workflow::{self, Column};

#[derive(Serialize)]
struct Board {
    team: Team,
    project_id: Option<String>,
    columns: Vec<Column>,
}

pub async fn show(
    client: &LinearClient,
    config: &Config,
    team: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let needle = config
        .resolve_team(team.as_deref())
        .ok_or(LinearError::NoTeam)?;
    let team = teams::find(client, None, &needle).await?;

    let states = states::for_team(client, None, &team.id).await?;
    let issues = issues::list(client, None, &team.id, project.as_deref()).await?;

    let board = Board {
        columns: workflow::build_board(states, issues),
        team,
        project_id: project,
    };
    output::print_item(&board, print_board);

    Ok(())
}

fn print_board(board: &Board) {
    println!("{}", board.team.name.bold());
    for column in &board.columns {
        let state = &column.state;
        println!();
        println!(
            "{} ({})",
            status_colored(&state.name, state.color.as_deref(), state.state_type),
            column.issues.len()
        );
        for issue in &column.issues {
            let assignee = issue
                .assignee
                .as_ref()
                .map(|u| format!(" @{}", u.label()))
                .unwrap_or_default();
            println!(
                "  {} {}{}",
                issue.identifier.cyan(),
                truncate(&issue.title, 60),
                assignee.bright_black()
            );
        }
    }
}
