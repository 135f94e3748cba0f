use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
}

impl Team {
    /// Match a team by id or by its key (case-insensitive).
    pub fn matches(&self, needle: &str) -> bool {
        self.id == needle
            || self
                .key
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(needle))
    }
}
