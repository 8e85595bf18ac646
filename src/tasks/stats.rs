use serde::Serialize;

use super::storage::{TaskError, TaskStorage};

/// Per-status task counts, zero-filled for statuses with no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub not_started: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Aggregate completion statistics over the whole task table.
///
/// `completion_rate` is a percentage rounded to 2 decimal places; the
/// report endpoint re-rounds it to 1 decimal via [`TaskStats::report_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskStats {
    pub total_count: i64,
    pub status_counts: StatusCounts,
    pub completion_rate: f64,
}

impl TaskStats {
    /// Build stats from `(status_label, count)` rows as returned by
    /// `GROUP BY status`. Unknown labels cannot occur — the closed enum is
    /// enforced on every write path.
    pub fn from_counts(rows: &[(String, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (label, n) in rows {
            match label.as_str() {
                "not_started" => counts.not_started = *n,
                "in_progress" => counts.in_progress = *n,
                "completed" => counts.completed = *n,
                _ => {}
            }
        }
        let total_count = counts.not_started + counts.in_progress + counts.completed;
        let completion_rate = if total_count == 0 {
            0.0
        } else {
            round2(counts.completed as f64 / total_count as f64 * 100.0)
        };
        Self {
            total_count,
            status_counts: counts,
            completion_rate,
        }
    }

    /// The externally reported completion rate: the 2-decimal rate rounded
    /// once more to 1 decimal place.
    pub fn report_rate(&self) -> f64 {
        (self.completion_rate * 10.0).round() / 10.0
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl TaskStorage {
    /// One grouped query plus in-memory zero-filling.
    pub async fn stats(&self) -> Result<TaskStats, TaskError> {
        let rows = self.status_counts().await?;
        Ok(TaskStats::from_counts(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(rows: &[(&str, i64)]) -> Vec<(String, i64)> {
        rows.iter().map(|(s, n)| (s.to_string(), *n)).collect()
    }

    #[test]
    fn empty_table_is_all_zeroes() {
        let stats = TaskStats::from_counts(&[]);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.status_counts, StatusCounts::default());
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.report_rate(), 0.0);
    }

    #[test]
    fn half_completed_is_fifty_percent() {
        let stats = TaskStats::from_counts(&counts(&[
            ("not_started", 1),
            ("in_progress", 1),
            ("completed", 2),
        ]));
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.status_counts.not_started, 1);
        assert_eq!(stats.status_counts.in_progress, 1);
        assert_eq!(stats.status_counts.completed, 2);
        assert_eq!(stats.completion_rate, 50.0);
        assert_eq!(stats.report_rate(), 50.0);
    }

    #[test]
    fn one_third_rounds_to_two_then_one_decimals() {
        let stats = TaskStats::from_counts(&counts(&[
            ("not_started", 1),
            ("in_progress", 1),
            ("completed", 1),
        ]));
        assert_eq!(stats.completion_rate, 33.33);
        assert_eq!(stats.report_rate(), 33.3);
    }

    #[test]
    fn two_thirds_rounds_up() {
        let stats =
            TaskStats::from_counts(&counts(&[("not_started", 1), ("completed", 2)]));
        assert_eq!(stats.completion_rate, 66.67);
        assert_eq!(stats.report_rate(), 66.7);
    }

    #[test]
    fn missing_statuses_are_zero_filled() {
        let stats = TaskStats::from_counts(&counts(&[("completed", 3)]));
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.status_counts.not_started, 0);
        assert_eq!(stats.status_counts.in_progress, 0);
        assert_eq!(stats.completion_rate, 100.0);
    }
}
