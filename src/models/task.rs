//! Background task domain models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Lifecycle state of a queued task.
///
/// Stored lowercase in the database; reported uppercase on the wire for
/// compatibility with the polling clients this server inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Started,
    Retry,
    Success,
    Failure,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Retry => "retry",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "started" => Some(Self::Started),
            "retry" => Some(Self::Retry),
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }

    /// Wire form used by the status endpoint.
    pub fn wire_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Retry => "RETRY",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    /// HTTP status for the polling endpoint: 200 done, 206 still working,
    /// 203 failed (non-authoritative result).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Failure => 203,
            Self::Pending | Self::Started | Self::Retry => 206,
        }
    }

    /// Human readable progress message for the polling endpoint.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Pending => "Task not started yet",
            Self::Started | Self::Retry => "Task is still in progress",
            Self::Success => "Task has succeeded",
            Self::Failure => "Task has failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response body for task polling.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskStatusResponse {
    /// Wire state: PENDING, STARTED, RETRY, SUCCESS or FAILURE.
    pub state: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_http_mapping() {
        assert_eq!(TaskState::Success.http_status(), 200);
        assert_eq!(TaskState::Failure.http_status(), 203);
        assert_eq!(TaskState::Pending.http_status(), 206);
        assert_eq!(TaskState::Started.http_status(), 206);
        assert_eq!(TaskState::Retry.http_status(), 206);
    }

    #[test]
    fn test_state_wire_form() {
        assert_eq!(TaskState::Retry.wire_str(), "RETRY");
        assert_eq!(TaskState::parse("retry"), Some(TaskState::Retry));
        assert_eq!(TaskState::parse("RETRY"), None);
    }
}
