//! Task read model reported by the Task Store.

use serde::{Deserialize, Serialize};

/// Task lifecycle state as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Open and still actionable.
    NeedsAction,
    /// Marked done by the user.
    Completed,
}

impl TaskStatus {
    /// Maps the upstream status string; anything but `completed` is open.
    pub fn from_wire(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("completed") {
            Self::Completed
        } else {
            Self::NeedsAction
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::NeedsAction => "needsAction",
            Self::Completed => "completed",
        }
    }
}

/// Task as seen by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub title: String,
    pub status: TaskStatus,
}

impl TaskRecord {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::TaskStatus;

    #[test]
    fn wire_status_defaults_to_open() {
        assert_eq!(TaskStatus::from_wire("completed"), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_wire("Completed "), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_wire("needsAction"), TaskStatus::NeedsAction);
        assert_eq!(TaskStatus::from_wire(""), TaskStatus::NeedsAction);
    }
}
