use serde::{Deserialize, Serialize};

use super::{Team, User};
use crate::responses::Connection;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub lead: Option<User>,
    #[serde(default)]
    pub teams: Connection<Team>,
}

impl Project {
    pub fn belongs_to(&self, team_id: &str) -> bool {
        self.teams.nodes.iter().any(|t| t.id == team_id)
    }
}
