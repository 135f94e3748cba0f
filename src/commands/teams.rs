use tabled::Tabled;

use crate::client::LinearClient;
use crate::error::Result;
use crate::linear::teams;
use crate::output;
use crate::types::Team;

#[derive(Tabled)]
struct TeamRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        Self {
            key: team.key.clone().unwrap_or_default(),
            name: team.name.clone(),
            id: team.id.clone(),
        }
    }
}

pub async fn list(client: &LinearClient) -> Result<()> {
    let teams = teams::list(client, None).await?;
    output::print_table(&teams, |t| TeamRow::from(t));
    Ok(())
}
