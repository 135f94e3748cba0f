use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "linear-roadmap")]
#[command(about = "Roadmap board and issue editor for Linear", version)]
#[command(after_help = "EXAMPLES:
    linear-roadmap serve --port 8080      Start the web front end
    linear-roadmap roadmap --team ENG     Show the team's board
    linear-roadmap issue show ENG-123     Show issue details
    linear-roadmap issue comment ENG-123 \"Note\"  Add a comment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web front end
    #[command(after_help = "EXAMPLES:
    linear-roadmap serve
    PORT=8080 linear-roadmap serve
    linear-roadmap serve --port 8080")]
    Serve {
        /// Port to listen on (default: PORT env var, config, or 5000)
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// List teams
    #[command(after_help = "EXAMPLES:
    linear-roadmap teams
    linear-roadmap teams --json")]
    Teams,
    /// List projects
    #[command(after_help = "EXAMPLES:
    linear-roadmap projects
    linear-roadmap projects --team ENG")]
    Projects {
        /// Only projects of this team (key or ID)
        #[arg(long)]
        team: Option<String>,
    },
    /// Show the roadmap board of a team
    #[command(after_help = "EXAMPLES:
    linear-roadmap roadmap --team ENG
    linear-roadmap roadmap --team ENG --project <project-id>")]
    Roadmap {
        /// Team key or ID (uses default if not specified)
        #[arg(long)]
        team: Option<String>,

        /// Only issues of this project ID
        #[arg(long)]
        project: Option<String>,
    },
    /// Inspect and edit issues
    #[command(after_help = "EXAMPLES:
    linear-roadmap issue show ENG-123
    linear-roadmap issue update ENG-123 --state <state-id>
    linear-roadmap issue update ENG-123 --unassign")]
    Issue {
        #[command(subcommand)]
        action: IssueCommands,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    linear-roadmap completions bash > ~/.bash_completion.d/linear-roadmap
    linear-roadmap completions zsh > ~/.zfunc/_linear-roadmap")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    Init,
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// Show issue details, workflow states and team members
    Show {
        /// Issue identifier (e.g., ENG-123) or UUID
        id: String,
    },
    /// List comments on an issue
    Comments {
        /// Issue identifier (e.g., ENG-123) or UUID
        id: String,
    },
    /// Add a comment to an issue
    #[command(after_help = "EXAMPLES:
    linear-roadmap issue comment ENG-123 \"This is a comment\"")]
    Comment(CommentArgs),
    /// Update an existing issue
    Update(IssueUpdateArgs),
}

#[derive(Args)]
pub struct CommentArgs {
    /// Issue identifier (e.g., ENG-123) or UUID
    pub id: String,

    /// Comment body (markdown supported)
    pub body: String,
}

#[derive(Args)]
pub struct IssueUpdateArgs {
    /// Issue identifier (e.g., ENG-123) or UUID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// Workflow state ID (see `issue show`)
    #[arg(long)]
    pub state: Option<String>,

    /// Assign to user ID
    #[arg(long, conflicts_with = "unassign")]
    pub assignee: Option<String>,

    /// Remove the current assignee
    #[arg(long)]
    pub unassign: bool,
}
