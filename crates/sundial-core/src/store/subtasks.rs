//! Sub-task actions.
//!
//! Sub-tasks have no endpoint of their own: every change edits the parent
//! task's embedded list and pushes the whole task through the full-update
//! round-trip. The server reassigns ids for rows it has not seen, so a
//! locally added sub-task carries a provisional id only until the response
//! replaces the list.

use chrono::Utc;
use tracing::instrument;

use crate::error::{StoreError, StoreResult};
use crate::messages::MessageKey;
use crate::model::{SubTask, SubTaskPatch};
use crate::store::App;

impl App {
    /// Append a sub-task and sync the parent. Returns the provisional id
    /// the new row carries until the server response lands.
    #[instrument(skip(self, title))]
    pub async fn add_sub_task(&mut self, task_id: i64, title: impl Into<String>) -> StoreResult<i64> {
        let provisional = Utc::now().timestamp_millis();
        let payload = {
            let Some(task) = self.tasks.get(task_id) else {
                self.task_failure(MessageKey::UpdatingTask);
                return Err(StoreError::NotFoundLocal {
                    kind: "task",
                    id: task_id,
                });
            };
            let mut payload = task.to_payload();
            payload.sub_tasks.push(SubTask {
                id: Some(provisional),
                title: title.into(),
                is_completed: false,
            });
            payload
        };
        self.update_task(task_id, payload).await?;
        Ok(provisional)
    }

    /// Patch one sub-task's fields and sync the parent.
    #[instrument(skip(self, patch))]
    pub async fn update_sub_task(
        &mut self,
        task_id: i64,
        sub_id: i64,
        patch: SubTaskPatch,
    ) -> StoreResult<()> {
        let payload = {
            let Some(task) = self.tasks.get(task_id) else {
                self.task_failure(MessageKey::UpdatingTask);
                return Err(StoreError::NotFoundLocal {
                    kind: "task",
                    id: task_id,
                });
            };
            let mut payload = task.to_payload();
            let Some(slot) = payload
                .sub_tasks
                .iter_mut()
                .find(|sub| sub.id == Some(sub_id))
            else {
                self.task_failure(MessageKey::UpdatingTask);
                return Err(StoreError::NotFoundLocal {
                    kind: "sub-task",
                    id: sub_id,
                });
            };
            if let Some(title) = patch.title {
                slot.title = title;
            }
            if let Some(done) = patch.is_completed {
                slot.is_completed = done;
            }
            payload
        };
        self.update_task(task_id, payload).await
    }

    /// Flip one sub-task's completion and sync the parent. Returns the
    /// new state.
    #[instrument(skip(self))]
    pub async fn toggle_sub_task(&mut self, task_id: i64, sub_id: i64) -> StoreResult<bool> {
        let current = self
            .tasks
            .get(task_id)
            .and_then(|task| task.sub_tasks.iter().find(|sub| sub.id == Some(sub_id)))
            .map(|sub| sub.is_completed);
        let Some(current) = current else {
            self.task_failure(MessageKey::UpdatingTask);
            return Err(StoreError::NotFoundLocal {
                kind: "sub-task",
                id: sub_id,
            });
        };
        let next = !current;
        self.update_sub_task(
            task_id,
            sub_id,
            SubTaskPatch {
                title: None,
                is_completed: Some(next),
            },
        )
        .await?;
        Ok(next)
    }

    /// Remove one sub-task and sync the parent.
    #[instrument(skip(self))]
    pub async fn delete_sub_task(&mut self, task_id: i64, sub_id: i64) -> StoreResult<()> {
        let payload = {
            let Some(task) = self.tasks.get(task_id) else {
                self.task_failure(MessageKey::UpdatingTask);
                return Err(StoreError::NotFoundLocal {
                    kind: "task",
                    id: task_id,
                });
            };
            let before = task.sub_tasks.len();
            let mut payload = task.to_payload();
            payload.sub_tasks.retain(|sub| sub.id != Some(sub_id));
            if payload.sub_tasks.len() == before {
                self.task_failure(MessageKey::UpdatingTask);
                return Err(StoreError::NotFoundLocal {
                    kind: "sub-task",
                    id: sub_id,
                });
            }
            payload
        };
        self.update_task(task_id, payload).await
    }
}
