use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Linear's workflow state categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateType {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Canceled,
    /// Anything Linear adds later (e.g. `triage`) or omits.
    #[default]
    Unknown,
}

impl StateType {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "backlog" => StateType::Backlog,
            "unstarted" => StateType::Unstarted,
            "started" => StateType::Started,
            "completed" => StateType::Completed,
            "canceled" => StateType::Canceled,
            _ => StateType::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StateType::Backlog => "backlog",
            StateType::Unstarted => "unstarted",
            StateType::Started => "started",
            StateType::Completed => "completed",
            StateType::Canceled => "canceled",
            StateType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for StateType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for StateType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|v| StateType::parse(&v)).unwrap_or_default())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(rename = "type", default)]
    pub state_type: StateType,
}

impl WorkflowState {
    /// Position rank, with a missing value treated as zero.
    pub fn rank(&self) -> f64 {
        self.position.unwrap_or(0.0)
    }
}
