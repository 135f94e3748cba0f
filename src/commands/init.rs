use std::io::{self, Write};

use crate::config::Config;
use crate::error::{LinearError, Result};
use crate::output;

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Render the config file, leaving out optional values that were skipped.
fn render_config(api_key: &str, default_team: &str, client_id: &str, client_secret: &str) -> String {
    let mut content = format!("api_key = {api_key:?}\n");
    for (key, value) in [
        ("default_team", default_team),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ] {
        if !value.is_empty() {
            content.push_str(&format!("{key} = {value:?}\n"));
        }
    }
    content
}

pub async fn run() -> Result<()> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Linear Roadmap Configuration");
    println!("============================\n");

    let api_key =
        prompt("Enter your Linear API key (create one at https://linear.app/settings/api): ")?;
    if api_key.is_empty() {
        return Err(LinearError::MissingApiKey);
    }
    let default_team = prompt("Enter default team key (e.g., ENG) [optional]: ")?;
    let client_id = prompt("Enter OAuth client ID for web login [optional]: ")?;
    let client_secret = if client_id.is_empty() {
        String::new()
    } else {
        prompt("Enter OAuth client secret: ")?
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LinearError::ConfigRead {
            path: config_path.clone(),
            source: e,
        })?;
    }

    let content = render_config(&api_key, &default_team, &client_id, &client_secret);
    std::fs::write(&config_path, content).map_err(|e| LinearError::ConfigRead {
        path: config_path.clone(),
        source: e,
    })?;

    output::print_message(&format!("Config saved to {}", config_path.display()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_config_parses_back() {
        let content = render_config("lin_api_x\"y", "ENG", "", "");
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("lin_api_x\"y"));
        assert_eq!(config.default_team.as_deref(), Some("ENG"));
        assert!(config.client_id.is_none());
    }
}
