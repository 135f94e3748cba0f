use serde::{Deserialize, Serialize};

use super::User;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub user: Option<User>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}
