mod cli;
mod client;
mod commands;
mod config;
mod error;
mod linear;
mod oauth;
mod output;
mod resilience;
mod responses;
mod session;
mod types;
mod web;
mod workflow;

use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, IssueCommands};
use client::LinearClient;
use config::Config;
use oauth::{OAuthConfig, OAuthManager};

const DEFAULT_LOG_FILTER: &str = "linear_roadmap=info,tower_http=info";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {cause}");
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr; the server logs at info, the CLI only warns unless
/// RUST_LOG says otherwise.
fn init_tracing(cli: &Cli) {
    let default = match cli.command {
        Commands::Serve { .. } => DEFAULT_LOG_FILTER,
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_client(config: &Config, api_key: Option<String>) -> error::Result<LinearClient> {
    let client = LinearClient::new(api_key, config.request_timeout())?;
    Ok(match &config.api_endpoint {
        Some(endpoint) => client.with_endpoint(endpoint.as_str()),
        None => client,
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    output::set_json_output(cli.json);

    match cli.command {
        // Commands that don't require config/client
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "linear-roadmap", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        Commands::Serve { port } => {
            let config = Config::load()?;
            let client = build_client(&config, config.api_key.clone())?;
            commands::serve::run(client, &config, port).await?;
        }
        // Commands that require an API key
        command => {
            let config = Config::load()?;
            let client = build_client(&config, Some(config.api_key()?))?;

            match command {
                Commands::Teams => {
                    commands::teams::list(&client).await?;
                }
                Commands::Projects { team } => {
                    commands::projects::list(&client, &config, team).await?;
                }
                Commands::Roadmap { team, project } => {
                    commands::roadmap::show(&client, &config, team, project).await?;
                }
                Commands::Issue { action } => match action {
                    IssueCommands::Show { id } => {
                        commands::issues::show(&client, &id).await?;
                    }
                    IssueCommands::Comments { id } => {
                        commands::comments::list(&client, &id).await?;
                    }
                    IssueCommands::Comment(args) => {
                        let oauth =
                            OAuthManager::new(client.clone(), OAuthConfig::from_config(&config));
                        commands::comments::add(&client, &oauth, args).await?;
                    }
                    IssueCommands::Update(args) => {
                        commands::issues::update(&client, args).await?;
                    }
                },
                Commands::Completions { .. } | Commands::Init | Commands::Serve { .. } => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
