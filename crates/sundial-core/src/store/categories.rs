use tracing::{debug, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::messages::MessageKey;
use crate::model::Category;
use crate::store::{App, today};

/// Category (task list) cache. `task_count` on each entry is the
/// today-scoped counter the client maintains; the server never sends it.
#[derive(Debug, Default)]
pub struct CategoryStore {
    items: Vec<Category>,
    pub error: Option<String>,
    pub loading: bool,
}

impl CategoryStore {
    pub fn all(&self) -> &[Category] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.items.iter().find(|cat| cat.id == id)
    }

    pub fn by_title(&self, title: &str) -> Option<&Category> {
        self.items.iter().find(|cat| cat.title == title)
    }

    pub(crate) fn set_count(&mut self, id: i64, count: u64) {
        if let Some(cat) = self.items.iter_mut().find(|cat| cat.id == id) {
            cat.task_count = Some(count);
        }
    }
}

impl App {
    fn category_failure(&mut self, key: MessageKey) -> String {
        let message = self.message(key).to_string();
        self.categories.error = Some(message.clone());
        self.notifier.error(message.clone());
        message
    }

    /// Refresh the category cache and recompute every today-scoped
    /// counter from the task cache. Fails soft.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&mut self) {
        self.categories.loading = true;
        self.categories.error = None;
        match self.gateway.list_categories().await {
            Ok(categories) => {
                debug!(count = categories.len(), "categories fetched");
                self.categories.items = categories;
                let now = today();
                let counts: Vec<(i64, u64)> = self
                    .categories
                    .items
                    .iter()
                    .map(|cat| (cat.id, self.tasks.count_for_category(cat.id, now)))
                    .collect();
                for (id, count) in counts {
                    self.categories.set_count(id, count);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch categories");
                self.category_failure(MessageKey::FetchingLists);
            }
        }
        self.categories.loading = false;
    }

    /// Create a category. A uniqueness conflict gets its own message;
    /// either way the error is recorded, notified and rethrown.
    #[instrument(skip(self))]
    pub async fn create_category(&mut self, title: &str) -> StoreResult<i64> {
        self.categories.error = None;
        match self.gateway.create_category(title).await {
            Ok(mut category) => {
                let id = category.id;
                category.task_count = Some(0);
                self.categories.items.push(category);
                debug!(id, title, "category created");
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, title, "failed to create category");
                let key = if err.is_conflict() {
                    MessageKey::ListAlreadyExists
                } else {
                    MessageKey::CreatingList
                };
                self.category_failure(key);
                Err(err)
            }
        }
    }

    /// Rename a category. The counter carries over; only the title comes
    /// from the server.
    #[instrument(skip(self))]
    pub async fn rename_category(&mut self, id: i64, title: &str) -> StoreResult<()> {
        self.categories.error = None;
        let fresh = match self.gateway.replace_category(id, title).await {
            Ok(category) => category,
            Err(err) => {
                warn!(error = %err, id, "failed to rename category");
                self.category_failure(MessageKey::UpdatingList);
                return Err(err);
            }
        };
        let Some(slot) = self.categories.items.iter_mut().find(|cat| cat.id == id) else {
            self.category_failure(MessageKey::UpdatingList);
            return Err(StoreError::NotFoundLocal {
                kind: "category",
                id,
            });
        };
        slot.title = fresh.title;
        debug!(id, title, "category renamed");
        Ok(())
    }

    /// Delete a category. Tasks that referenced it stay cached but become
    /// uncategorized.
    #[instrument(skip(self))]
    pub async fn delete_category(&mut self, id: i64) -> StoreResult<()> {
        self.categories.error = None;
        if let Err(err) = self.gateway.delete_category(id).await {
            warn!(error = %err, id, "failed to delete category");
            self.category_failure(MessageKey::DeletingList);
            return Err(err);
        }
        let before = self.categories.items.len();
        self.categories.items.retain(|cat| cat.id != id);
        if self.categories.items.len() == before {
            self.category_failure(MessageKey::DeletingList);
            return Err(StoreError::NotFoundLocal {
                kind: "category",
                id,
            });
        }
        self.tasks.orphan_category(id);
        debug!(id, "category deleted");
        Ok(())
    }
}
