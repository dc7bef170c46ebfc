use tracing::{debug, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::messages::MessageKey;
use crate::model::Tag;
use crate::store::App;

/// Tag cache. Tasks embed tag snapshots, so every rename and deletion
/// here fans out into the task store.
#[derive(Debug, Default)]
pub struct TagStore {
    items: Vec<Tag>,
    pub error: Option<String>,
    pub loading: bool,
}

impl TagStore {
    pub fn all(&self) -> &[Tag] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&Tag> {
        self.items.iter().find(|tag| tag.id == id)
    }

    pub fn by_title(&self, title: &str) -> Option<&Tag> {
        self.items.iter().find(|tag| tag.title == title)
    }
}

impl App {
    fn tag_failure(&mut self, key: MessageKey) -> String {
        let message = self.message(key).to_string();
        self.tags.error = Some(message.clone());
        self.notifier.error(message.clone());
        message
    }

    /// Refresh the tag cache. Fails soft.
    #[instrument(skip(self))]
    pub async fn fetch_tags(&mut self) {
        self.tags.loading = true;
        self.tags.error = None;
        match self.gateway.list_tags().await {
            Ok(tags) => {
                debug!(count = tags.len(), "tags fetched");
                self.tags.items = tags;
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch tags");
                self.tag_failure(MessageKey::FetchingTags);
            }
        }
        self.tags.loading = false;
    }

    /// Create a tag. A uniqueness conflict gets its own message; either
    /// way the error is recorded, notified and rethrown.
    #[instrument(skip(self))]
    pub async fn create_tag(&mut self, title: &str) -> StoreResult<i64> {
        self.tags.error = None;
        match self.gateway.create_tag(title).await {
            Ok(tag) => {
                let id = tag.id;
                self.tags.items.push(tag);
                debug!(id, title, "tag created");
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, title, "failed to create tag");
                let key = if err.is_conflict() {
                    MessageKey::TagAlreadyExists
                } else {
                    MessageKey::CreatingTag
                };
                self.tag_failure(key);
                Err(err)
            }
        }
    }

    /// Rename a tag and propagate the new snapshot into every task that
    /// embeds it.
    #[instrument(skip(self))]
    pub async fn rename_tag(&mut self, id: i64, title: &str) -> StoreResult<()> {
        self.tags.error = None;
        let fresh = match self.gateway.replace_tag(id, title).await {
            Ok(tag) => tag,
            Err(err) => {
                warn!(error = %err, id, "failed to rename tag");
                self.tag_failure(MessageKey::UpdatingTag);
                return Err(err);
            }
        };
        let Some(slot) = self.tags.items.iter_mut().find(|tag| tag.id == id) else {
            self.tag_failure(MessageKey::UpdatingTag);
            return Err(StoreError::NotFoundLocal { kind: "tag", id });
        };
        *slot = fresh.clone();
        self.tasks.apply_tag(&fresh);
        debug!(id, title, "tag renamed");
        Ok(())
    }

    /// Delete a tag and strip it from every task that carried it.
    #[instrument(skip(self))]
    pub async fn delete_tag(&mut self, id: i64) -> StoreResult<()> {
        self.tags.error = None;
        if let Err(err) = self.gateway.delete_tag(id).await {
            warn!(error = %err, id, "failed to delete tag");
            self.tag_failure(MessageKey::DeletingTag);
            return Err(err);
        }
        let before = self.tags.items.len();
        self.tags.items.retain(|tag| tag.id != id);
        if self.tags.items.len() == before {
            self.tag_failure(MessageKey::DeletingTag);
            return Err(StoreError::NotFoundLocal { kind: "tag", id });
        }
        self.tasks.strip_tag(id);
        debug!(id, "tag deleted");
        Ok(())
    }
}
