use tabled::Tabled;

use crate::cli::CommentArgs;
use crate::client::LinearClient;
use crate::error::Result;
use crate::linear::comments;
use crate::oauth::OAuthManager;
use crate::output::{self, format_relative, truncate};
use crate::resilience::{self, CallerAuth};
use crate::types::Comment;

#[derive(Tabled)]
struct CommentRow {
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Comment")]
    body: String,
    #[tabled(rename = "When")]
    created_at: String,
}

impl From<&Comment> for CommentRow {
    fn from(comment: &Comment) -> Self {
        Self {
            author: comment
                .user
                .as_ref()
                .map(|u| u.label().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            body: truncate(&comment.body.replace('\n', " "), 60),
            created_at: format_relative(&comment.created_at),
        }
    }
}

pub async fn list(client: &LinearClient, issue_id: &str) -> Result<()> {
    let comments = comments::list(client, None, issue_id).await?;

    if comments.is_empty() {
        output::print_message(&format!("No comments on {issue_id}"));
        return Ok(());
    }

    output::print_table(&comments, |c| CommentRow::from(c));

    Ok(())
}

pub async fn add(client: &LinearClient, oauth: &OAuthManager, args: CommentArgs) -> Result<()> {
    let mut auth = CallerAuth::api_key();
    let created = resilience::add_comment(client, oauth, &mut auth, &args.id, &args.body).await?;

    output::print_item(&created, |c| {
        println!("Added comment to {} ({})", args.id, c.shape);
    });

    Ok(())
}
