use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::storage::QUERY_TIMEOUT;

use super::model::{
    GenreRow, NewTask, TaskPatch, TaskRow, TaskStatus, TaskWithGenre, DUPLICATE_SUFFIX,
};

/// Errors surfaced by task and genre operations. The REST layer maps
/// `NotFound` to 404, `Validation` to 422, and everything else to 500.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("database query timed out after {0}s")]
    Timeout(u64),
}

/// Execute a future with the standard query timeout (same as storage/mod.rs).
async fn with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T, TaskError>>,
) -> Result<T, TaskError> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(TaskError::Timeout(QUERY_TIMEOUT.as_secs())),
    }
}

/// Task and genre queries over the shared SQLite pool.
#[derive(Clone)]
pub struct TaskStorage {
    pool: SqlitePool,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl TaskStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─── Tasks ───────────────────────────────────────────────────────────────

    /// Full task listing with the genre joined in, in creation order
    /// (`ORDER BY id ASC` — explicit so the order never depends on the
    /// storage engine's iteration order).
    pub async fn list_with_genre(&self) -> Result<Vec<TaskWithGenre>, TaskError> {
        with_timeout(async {
            Ok(sqlx::query_as(
                "SELECT t.id, t.name, t.explanation, t.status, t.priority,
                        t.deadline_date, t.genre_id, t.created_at, t.updated_at,
                        g.name AS genre_name
                 FROM tasks t
                 JOIN genres g ON g.id = t.genre_id
                 ORDER BY t.id ASC",
            )
            .fetch_all(&self.pool)
            .await?)
        })
        .await
    }

    pub async fn get(&self, id: i64) -> Result<Option<TaskRow>, TaskError> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Insert a new task. The referenced genre must exist.
    pub async fn create(&self, new: &NewTask) -> Result<i64, TaskError> {
        if new.name.trim().is_empty() {
            return Err(TaskError::Validation("name must not be empty".into()));
        }
        if !self.genre_exists(new.genre_id).await? {
            return Err(TaskError::Validation(format!(
                "genre {} does not exist",
                new.genre_id
            )));
        }
        let now = now_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tasks (name, explanation, status, priority, deadline_date, genre_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&new.name)
        .bind(&new.explanation)
        .bind(new.status.as_str())
        .bind(new.priority.as_str())
        .bind(new.deadline_date)
        .bind(new.genre_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Partial update — absent patch fields keep their current value.
    pub async fn update(&self, id: i64, patch: TaskPatch) -> Result<(), TaskError> {
        let row = self.get(id).await?.ok_or(TaskError::NotFound)?;

        if let Some(genre_id) = patch.genre_id {
            if !self.genre_exists(genre_id).await? {
                return Err(TaskError::Validation(format!(
                    "genre {genre_id} does not exist"
                )));
            }
        }

        let name = patch.name.unwrap_or(row.name);
        if name.trim().is_empty() {
            return Err(TaskError::Validation("name must not be empty".into()));
        }
        let explanation = patch.explanation.unwrap_or(row.explanation);
        let status = patch
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or(row.status);
        let priority = patch
            .priority
            .map(|p| p.as_str().to_string())
            .unwrap_or(row.priority);
        let genre_id = patch.genre_id.unwrap_or(row.genre_id);
        let deadline_date = match patch.deadline_date {
            Some(value) => value,
            None => row.deadline_date,
        };

        sqlx::query(
            "UPDATE tasks
             SET name = ?, explanation = ?, status = ?, priority = ?,
                 deadline_date = ?, genre_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&name)
        .bind(&explanation)
        .bind(&status)
        .bind(&priority)
        .bind(deadline_date)
        .bind(genre_id)
        .bind(now_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set only the status field, leaving everything else untouched.
    pub async fn set_status(&self, id: i64, status: TaskStatus) -> Result<(), TaskError> {
        let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), TaskError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TaskError::NotFound);
        }
        Ok(())
    }

    /// Clone a task. The read and the insert share one transaction, so a
    /// concurrent delete of the source cannot produce a half-applied clone.
    ///
    /// The clone keeps explanation, priority, and genre; the name gains the
    /// copy suffix, status resets to not_started, and the deadline clears.
    pub async fn duplicate(&self, id: i64) -> Result<i64, TaskError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let row = row.ok_or(TaskError::NotFound)?;

        let now = now_rfc3339();
        let new_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tasks (name, explanation, status, priority, deadline_date, genre_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, NULL, ?, ?, ?)
             RETURNING id",
        )
        .bind(format!("{}{}", row.name, DUPLICATE_SUFFIX))
        .bind(&row.explanation)
        .bind(TaskStatus::NotStarted.as_str())
        .bind(&row.priority)
        .bind(row.genre_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(new_id)
    }

    /// Per-status row counts straight from SQLite. Statuses with no rows are
    /// simply absent — zero-filling happens in the stats layer.
    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>, TaskError> {
        Ok(
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    // ─── Genres ──────────────────────────────────────────────────────────────

    pub async fn genre_exists(&self, id: i64) -> Result<bool, TaskError> {
        let n: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n != 0)
    }

    pub async fn create_genre(&self, name: &str) -> Result<i64, TaskError> {
        if name.trim().is_empty() {
            return Err(TaskError::Validation("name must not be empty".into()));
        }
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO genres (name, created_at) VALUES (?, ?) RETURNING id",
        )
        .bind(name)
        .bind(now_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn list_genres(&self) -> Result<Vec<GenreRow>, TaskError> {
        Ok(sqlx::query_as("SELECT * FROM genres ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::tasks::model::TaskPriority;
    use chrono::NaiveDate;

    async fn open() -> (TaskStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).await.unwrap();
        (TaskStorage::new(storage.pool()), dir)
    }

    fn new_task(name: &str, genre_id: i64) -> NewTask {
        NewTask {
            name: name.to_string(),
            explanation: String::new(),
            status: TaskStatus::NotStarted,
            priority: TaskPriority::Low,
            genre_id,
            deadline_date: None,
        }
    }

    #[tokio::test]
    async fn create_requires_existing_genre() {
        let (tasks, _dir) = open().await;
        let err = tasks.create(&new_task("orphan", 99)).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn listing_is_in_creation_order_with_genre_joined() {
        let (tasks, _dir) = open().await;
        let genre = tasks.create_genre("work").await.unwrap();
        tasks.create(&new_task("first", genre)).await.unwrap();
        tasks.create(&new_task("second", genre)).await.unwrap();

        let listing = tasks.list_with_genre().await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "first");
        assert_eq!(listing[1].name, "second");
        assert!(listing[0].id < listing[1].id);
        assert_eq!(listing[0].genre_name, "work");
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields_alone() {
        let (tasks, _dir) = open().await;
        let genre = tasks.create_genre("work").await.unwrap();
        let mut task = new_task("original", genre);
        task.explanation = "keep me".to_string();
        let id = tasks.create(&task).await.unwrap();

        tasks
            .update(
                id,
                TaskPatch {
                    name: Some("renamed".to_string()),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();

        let row = tasks.get(id).await.unwrap().unwrap();
        assert_eq!(row.name, "renamed");
        assert_eq!(row.explanation, "keep me");
        assert_eq!(row.status, "not_started");
    }

    #[tokio::test]
    async fn update_can_clear_deadline_with_explicit_null() {
        let (tasks, _dir) = open().await;
        let genre = tasks.create_genre("work").await.unwrap();
        let mut task = new_task("dated", genre);
        task.deadline_date = NaiveDate::from_ymd_opt(2026, 12, 31);
        let id = tasks.create(&task).await.unwrap();

        tasks
            .update(
                id,
                TaskPatch {
                    deadline_date: Some(None),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tasks.get(id).await.unwrap().unwrap().deadline_date, None);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let (tasks, _dir) = open().await;
        let err = tasks.update(42, TaskPatch::default()).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound));
        assert!(matches!(
            tasks.set_status(42, TaskStatus::Completed).await,
            Err(TaskError::NotFound)
        ));
        assert!(matches!(tasks.delete(42).await, Err(TaskError::NotFound)));
        assert!(matches!(
            tasks.duplicate(42).await,
            Err(TaskError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_resets_status_and_clears_deadline() {
        let (tasks, _dir) = open().await;
        let genre = tasks.create_genre("work").await.unwrap();
        let mut task = new_task("Original Task", genre);
        task.explanation = "Original explanation".to_string();
        task.status = TaskStatus::InProgress;
        task.priority = TaskPriority::High;
        task.deadline_date = NaiveDate::from_ymd_opt(2025, 12, 31);
        let id = tasks.create(&task).await.unwrap();

        let clone_id = tasks.duplicate(id).await.unwrap();
        assert_ne!(clone_id, id);

        let clone = tasks.get(clone_id).await.unwrap().unwrap();
        assert_eq!(clone.name, "Original Task(コピー)");
        assert_eq!(clone.explanation, "Original explanation");
        assert_eq!(clone.status, "not_started");
        assert_eq!(clone.priority, "high");
        assert_eq!(clone.deadline_date, None);
        assert_eq!(clone.genre_id, genre);

        // Source row untouched
        let original = tasks.get(id).await.unwrap().unwrap();
        assert_eq!(original.name, "Original Task");
        assert_eq!(original.status, "in_progress");
        assert_eq!(
            original.deadline_date,
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert_eq!(tasks.list_with_genre().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn status_counts_group_by_label() {
        let (tasks, _dir) = open().await;
        let genre = tasks.create_genre("work").await.unwrap();
        for status in [
            TaskStatus::NotStarted,
            TaskStatus::Completed,
            TaskStatus::Completed,
        ] {
            let mut task = new_task("t", genre);
            task.status = status;
            tasks.create(&task).await.unwrap();
        }

        let mut counts = tasks.status_counts().await.unwrap();
        counts.sort();
        assert_eq!(
            counts,
            vec![("completed".to_string(), 2), ("not_started".to_string(), 1)]
        );
    }
}
