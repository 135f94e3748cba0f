use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// The authenticated user behind an access token.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: String,
    pub name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Viewer {
    /// Stand-in identity used when the viewer lookup fails after login.
    pub fn unknown() -> Self {
        Self {
            id: "unknown".to_string(),
            name: "Unknown User".to_string(),
            display_name: Some("Unknown User".to_string()),
            email: None,
        }
    }
}
