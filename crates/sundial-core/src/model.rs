use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority. Wire values follow the backend's single-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "L")]
    Low,
    #[default]
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    High,
}

impl Priority {
    pub fn as_letter(self) -> &'static str {
        match self {
            Priority::Low => "L",
            Priority::Medium => "M",
            Priority::High => "H",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Priority::Low),
            "m" | "medium" => Ok(Priority::Medium),
            "h" | "high" => Ok(Priority::High),
            other => Err(anyhow::anyhow!("unknown priority: {other}")),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_letter())
    }
}

/// A sub-task owned by its parent task. `id` is `None` until the server has
/// persisted it; locally added sub-tasks carry a provisional id until the
/// next full update round-trip replaces them with server-assigned ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub is_completed: bool,
}

/// Field-level patch for a sub-task.
#[derive(Debug, Clone, Default)]
pub struct SubTaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

/// A user-defined task list. `task_count` is client-maintained and
/// today-scoped; it is never authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub task_count: Option<u64>,
}

/// A task as mirrored from the server. Tasks embed tag snapshots, not bare
/// ids, so tag renames must be propagated into every referencing task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub priority_level: Priority,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub dead_line: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, rename = "subTasks")]
    pub sub_tasks: Vec<SubTask>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Task {
    /// True when this task belongs in the date-index bucket for `date`:
    /// scheduled on that date or due on it.
    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.scheduled_date == date || self.dead_line == Some(date)
    }

    /// True when the task is relevant to "today": scheduled today, or
    /// scheduled in the past with a deadline that has not passed yet.
    pub fn relevant_on(&self, today: NaiveDate) -> bool {
        if self.scheduled_date == today {
            return true;
        }
        match self.dead_line {
            Some(deadline) => self.scheduled_date < today && deadline >= today,
            None => false,
        }
    }

    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }

    /// Flatten into the full-replacement payload the update endpoint
    /// expects: tag ids instead of snapshots, sub-tasks serialized inline.
    pub fn to_payload(&self) -> TaskPayload {
        TaskPayload {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            priority_level: self.priority_level,
            scheduled_date: self.scheduled_date,
            dead_line: self.dead_line,
            start_time: self.start_time,
            end_time: self.end_time,
            is_completed: self.is_completed,
            tags: self.tags.iter().map(|tag| tag.id).collect(),
            sub_tasks: self.sub_tasks.clone(),
        }
    }
}

/// Payload for task creation and full replacement. The create and update
/// endpoints accept the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub priority_level: Priority,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub dead_line: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default, rename = "subTasks")]
    pub sub_tasks: Vec<SubTask>,
}

/// Server acknowledgment of a completion toggle. Some backends return the
/// full task, some only a timestamp; only `updated_at` matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionReceipt {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Counts over the primary task cache, today-scoped except for `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn sample_task() -> Task {
        Task {
            id: 7,
            title: "Water the plants".to_string(),
            description: String::new(),
            category: Some(2),
            priority_level: Priority::High,
            scheduled_date: date("2024-06-01"),
            dead_line: Some(date("2024-06-03")),
            start_time: None,
            end_time: None,
            is_completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sub_tasks: vec![SubTask {
                id: Some(1),
                title: "Fill the can".to_string(),
                is_completed: false,
            }],
            tags: vec![Tag {
                id: 4,
                title: "home".to_string(),
            }],
        }
    }

    #[test]
    fn occupies_scheduled_and_deadline_dates() {
        let task = sample_task();
        assert!(task.occupies(date("2024-06-01")));
        assert!(task.occupies(date("2024-06-03")));
        assert!(!task.occupies(date("2024-06-02")));
    }

    #[test]
    fn relevant_on_covers_open_deadline_window() {
        let task = sample_task();
        assert!(task.relevant_on(date("2024-06-01")));
        assert!(task.relevant_on(date("2024-06-02")));
        assert!(task.relevant_on(date("2024-06-03")));
        assert!(!task.relevant_on(date("2024-06-04")));
        assert!(!task.relevant_on(date("2024-05-31")));
    }

    #[test]
    fn payload_flattens_tags_and_keeps_sub_tasks() {
        let task = sample_task();
        let payload = task.to_payload();
        assert_eq!(payload.tags, vec![4]);
        assert_eq!(payload.sub_tasks.len(), 1);
        assert_eq!(payload.is_completed, task.is_completed);
    }

    #[test]
    fn task_wire_shape_uses_sub_tasks_key_and_priority_letters() {
        let value = serde_json::to_value(sample_task()).expect("serialize");
        assert!(value.get("subTasks").is_some());
        assert_eq!(value["priority_level"], "H");
        assert_eq!(value["scheduled_date"], "2024-06-01");
    }

    #[test]
    fn task_deserializes_with_missing_optionals() {
        let raw = serde_json::json!({
            "id": 1,
            "title": "Bare",
            "priority_level": "L",
            "scheduled_date": "2024-06-01",
            "is_completed": false,
            "created_at": "2024-06-01T08:00:00Z",
            "updated_at": "2024-06-01T08:00:00Z"
        });
        let task: Task = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(task.category, None);
        assert!(task.sub_tasks.is_empty());
        assert!(task.tags.is_empty());
    }
}
