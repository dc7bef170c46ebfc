use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreResult;
use crate::model::{Category, CompletionReceipt, Tag, Task, TaskPayload};

/// Remote gateway contract consumed by the stores.
///
/// Implementations own all network I/O, auth-header injection and token
/// refresh; the stores only see the taxonomy in [`crate::error::StoreError`].
/// A 401 handled by refresh never surfaces here; only terminal auth
/// failures do, as [`crate::error::StoreError::Auth`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>>;
    async fn tasks_for_date(&self, date: NaiveDate) -> StoreResult<Vec<Task>>;
    async fn create_task(&self, payload: &TaskPayload) -> StoreResult<Task>;
    /// Full replacement; the server response is authoritative.
    async fn replace_task(&self, id: i64, payload: &TaskPayload) -> StoreResult<Task>;
    async fn delete_task(&self, id: i64) -> StoreResult<()>;
    /// Dedicated toggle endpoint; the receipt may carry the server's
    /// `updated_at`.
    async fn set_task_completion(&self, id: i64, completed: bool) -> StoreResult<CompletionReceipt>;

    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn create_category(&self, title: &str) -> StoreResult<Category>;
    async fn replace_category(&self, id: i64, title: &str) -> StoreResult<Category>;
    async fn delete_category(&self, id: i64) -> StoreResult<()>;

    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    async fn create_tag(&self, title: &str) -> StoreResult<Tag>;
    async fn replace_tag(&self, id: i64, title: &str) -> StoreResult<Tag>;
    async fn delete_tag(&self, id: i64) -> StoreResult<()>;
}
