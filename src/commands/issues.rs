use colored::Colorize;

use crate::cli::IssueUpdateArgs;
use crate::client::LinearClient;
use crate::error::Result;
use crate::linear::issues::{self, IssueDetail};
use crate::output::{self, format_date, format_relative, status_colored};
use crate::resilience::{self, CallerAuth, IssueUpdate};

pub async fn show(client: &LinearClient, id: &str) -> Result<()> {
    let detail = issues::detail(client, None, id).await?;
    output::print_item(&detail, print_detail);
    Ok(())
}

fn print_detail(detail: &IssueDetail) {
    let issue = &detail.issue;
    println!("{} - {}", issue.identifier.bold(), issue.title);
    println!();

    if let Some(desc) = issue.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{desc}");
        println!();
    }

    let status = issue
        .state
        .as_ref()
        .map(|s| status_colored(&s.name, s.color.as_deref(), s.state_type))
        .unwrap_or_else(|| "-".to_string());
    println!("Status:   {status}");
    println!(
        "Assignee: {}",
        issue.assignee.as_ref().map(|u| u.label()).unwrap_or("-")
    );
    println!("Created:  {}", format_date(&issue.created_at));
    println!("Updated:  {}", format_relative(&issue.updated_at));

    if !detail.workflow_states.is_empty() {
        println!();
        println!("{}", "Workflow states".bold());
        for state in &detail.workflow_states {
            println!(
                "  {}  {}",
                status_colored(&state.name, state.color.as_deref(), state.state_type),
                state.id.bright_black()
            );
        }
    }

    if !detail.team_members.is_empty() {
        println!();
        println!("{}", "Team members".bold());
        for member in &detail.team_members {
            println!(
                "  {}  {}",
                member.label(),
                member.id.as_deref().unwrap_or("-").bright_black()
            );
        }
    }

    if !detail.comments.is_empty() {
        println!();
        println!("{} ({})", "Comments".bold(), detail.comments.len());
    }
}

impl From<IssueUpdateArgs> for IssueUpdate {
    fn from(args: IssueUpdateArgs) -> Self {
        let assignee_id = if args.unassign {
            Some(None)
        } else {
            args.assignee.map(Some)
        };
        Self {
            title: args.title,
            description: args.description,
            state_id: args.state,
            assignee_id,
        }
    }
}

pub async fn update(client: &LinearClient, args: IssueUpdateArgs) -> Result<()> {
    let id = args.id.clone();
    let update = IssueUpdate::from(args);

    let issue = resilience::update_issue(client, &CallerAuth::api_key(), &id, &update).await?;
    output::print_message(&format!("Updated {} - {}", issue.identifier, issue.title));

    Ok(())
}
