use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Suffix appended to a duplicated task's name (localized "(copy)" marker,
/// kept verbatim from the product's Japanese UI).
pub const DUPLICATE_SUFFIX: &str = "(コピー)";

// ─── Closed enumerations ─────────────────────────────────────────────────────

/// Task lifecycle status. Closed set — unknown labels are rejected at the
/// API boundary, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// The label stored in the `tasks.status` column and rendered in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task priority. Closed set, same boundary rule as [`TaskStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

// ─── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct GenreRow {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub name: String,
    pub explanation: String,
    pub status: String,
    pub priority: String,
    pub deadline_date: Option<NaiveDate>,
    pub genre_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of the task listing — the genre join is eager so listing N tasks
/// stays a single query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskWithGenre {
    pub id: i64,
    pub name: String,
    pub explanation: String,
    pub status: String,
    pub priority: String,
    pub deadline_date: Option<NaiveDate>,
    pub genre_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub genre_name: String,
}

// ─── Write payloads ──────────────────────────────────────────────────────────

/// A fully-resolved new task, defaults already applied. Built by the create
/// handler from [`CreateTaskRequest`].
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub explanation: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub genre_id: i64,
    pub deadline_date: Option<NaiveDate>,
}

/// Request body for POST /tasks. Multiword fields arrive camelCase.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub explanation: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(rename = "genreId")]
    pub genre_id: i64,
    #[serde(rename = "deadlineDate")]
    pub deadline_date: Option<NaiveDate>,
}

/// Request body for PATCH /tasks/{id}. Absent fields are left unchanged;
/// `deadlineDate: null` explicitly clears the deadline.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub explanation: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(rename = "genreId")]
    pub genre_id: Option<i64>,
    #[serde(
        rename = "deadlineDate",
        default,
        deserialize_with = "absent_or_null"
    )]
    pub deadline_date: Option<Option<NaiveDate>>,
}

/// Request body for PATCH /tasks/{id}/status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// Request body for POST /genres.
#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

/// Distinguishes an absent field (outer `None`, keep current value) from an
/// explicit JSON `null` (inner `None`, clear the value).
fn absent_or_null<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: TaskStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn unknown_status_label_is_rejected() {
        assert!(serde_json::from_str::<TaskStatus>("\"done\"").is_err());
        assert!(serde_json::from_str::<TaskPriority>("\"urgent\"").is_err());
        // Case matters — the closed set is exact labels only.
        assert!(serde_json::from_str::<TaskStatus>("\"Completed\"").is_err());
    }

    #[test]
    fn patch_distinguishes_absent_from_null_deadline() {
        let patch: TaskPatch = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(patch.deadline_date.is_none());

        let patch: TaskPatch = serde_json::from_str(r#"{"deadlineDate":null}"#).unwrap();
        assert_eq!(patch.deadline_date, Some(None));

        let patch: TaskPatch = serde_json::from_str(r#"{"deadlineDate":"2026-01-31"}"#).unwrap();
        assert_eq!(
            patch.deadline_date,
            Some(Some(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()))
        );
    }

    #[test]
    fn create_request_maps_camel_case_fields() {
        let req: CreateTaskRequest = serde_json::from_str(
            r#"{"name":"t","priority":"high","genreId":3,"deadlineDate":"2026-12-31"}"#,
        )
        .unwrap();
        assert_eq!(req.genre_id, 3);
        assert_eq!(req.priority, Some(TaskPriority::High));
        assert!(req.status.is_none());
    }
}
