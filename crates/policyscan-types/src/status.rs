use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusResult {
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "completion", rename_all = "snake_case")]
pub enum StatusState {
    /// A scan epoch is in flight.
    Pending { message: String },
    /// The latest epoch published; `count` is the number of diagnostics in scope.
    Completed {
        result: StatusResult,
        message: String,
        count: usize,
    },
}

impl StatusState {
    pub fn is_pending(&self) -> bool {
        matches!(self, StatusState::Pending { .. })
    }

    pub fn result(&self) -> Option<StatusResult> {
        match self {
            StatusState::Pending { .. } => None,
            StatusState::Completed { result, .. } => Some(*result),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StatusState::Pending { message } | StatusState::Completed { message, .. } => message,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Warning,
    Error,
}

/// One offending finding in the status breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusNotification {
    pub title: String,
    pub kind: NotificationKind,
    /// Finding kind id (see `ids::KIND_*`).
    pub finding_kind: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusSnapshot {
    pub title: String,
    pub description: String,
    pub state: StatusState,
    /// Sorted by name.
    #[serde(default)]
    pub notifications: Vec<StatusNotification>,
}
