//! The client-side state layer: one [`App`] context owning the entity
//! caches, the derived date index, the notification queue and the message
//! catalog, with every mutation flowing through a gateway call first.
//!
//! Ownership discipline: each cache is mutated only through its own
//! methods. Cross-entity rules (tag renames, category orphaning) go
//! through the patch methods [`tasks::TaskStore`] exposes, never through
//! direct writes into its collections.

pub mod categories;
pub mod subtasks;
pub mod tags;
pub mod tasks;

use std::sync::Arc;

use chrono::{Local, NaiveDate, TimeDelta};
use tracing::instrument;

use crate::gateway::Gateway;
use crate::messages::{Catalog, MessageKey};
use crate::notify::Notifier;

pub use categories::CategoryStore;
pub use tags::TagStore;
pub use tasks::TaskStore;

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Application context: gateway handle plus all client-side state.
///
/// Actions take `&mut self`, so two actions of one app can never
/// interleave; suspension happens only at the gateway call inside each
/// action.
pub struct App {
    pub(crate) gateway: Arc<dyn Gateway>,
    pub tasks: TaskStore,
    pub tags: TagStore,
    pub categories: CategoryStore,
    pub notifier: Notifier,
    pub(crate) messages: Catalog,
}

impl App {
    pub fn new(gateway: Arc<dyn Gateway>, messages: Catalog, notify_ttl: Option<TimeDelta>) -> Self {
        Self {
            gateway,
            tasks: TaskStore::default(),
            tags: TagStore::default(),
            categories: CategoryStore::default(),
            notifier: Notifier::new(notify_ttl),
            messages,
        }
    }

    /// Startup hydration: tasks, categories and tags. Each fetch fails
    /// soft on its own.
    #[instrument(skip(self))]
    pub async fn initialize(&mut self) {
        self.fetch_all().await;
        self.fetch_categories().await;
        self.fetch_tags().await;
    }

    /// Recompute the today-scoped task count for one category. A `None`
    /// category (uncategorized) carries no counter.
    pub(crate) fn recount_category(&mut self, category: Option<i64>) {
        let Some(id) = category else {
            return;
        };
        let count = self.tasks.count_for_category(id, today());
        self.categories.set_count(id, count);
    }

    pub(crate) fn message(&self, key: MessageKey) -> &'static str {
        self.messages.text(key)
    }
}
