use std::sync::Arc;

use tracing::{info, warn};

use crate::client::LinearClient;
use crate::config::Config;
use crate::oauth::{OAuthConfig, OAuthManager};
use crate::web::{self, AppState};

pub async fn run(client: LinearClient, config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    if !client.has_api_key() {
        warn!("LINEAR_API_KEY not set, reads rely on logged-in users' tokens");
    }

    let oauth = OAuthManager::new(client.clone(), OAuthConfig::from_config(config));
    if oauth.is_configured() {
        info!(redirect_uri = oauth.redirect_uri(), "OAuth login enabled");
    }
    let state = Arc::new(AppState::new(client, oauth));

    web::serve(state, port.unwrap_or_else(|| config.port())).await
}
