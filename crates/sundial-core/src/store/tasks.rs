use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::messages::MessageKey;
use crate::model::{Priority, Task, TaskPayload, TaskStats};
use crate::store::{App, today};

/// Primary task cache plus the derived date index.
///
/// The index maps a calendar date to the tasks scheduled or due on it. It
/// is populated lazily per date; a key that was never fetched is never
/// materialized as a side effect of a mutation (guarded writes). All
/// dual-write bookkeeping is centralized in [`TaskStore::unindex`] and
/// [`TaskStore::index_into_existing`].
#[derive(Debug, Default)]
pub struct TaskStore {
    items: Vec<Task>,
    by_date: HashMap<NaiveDate, Vec<Task>>,
    pub error: Option<String>,
    pub loading: bool,
}

impl TaskStore {
    pub fn all(&self) -> &[Task] {
        &self.items
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.items.iter_mut().find(|task| task.id == id)
    }

    pub fn has_date(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    /// Tasks cached for `date`; empty when the date was never fetched.
    pub fn tasks_for_date(&self, date: NaiveDate) -> &[Task] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn replace_all(&mut self, tasks: Vec<Task>) {
        self.items = tasks;
        self.by_date.clear();
    }

    /// Materialize the bucket for `date` from the primary cache.
    pub(crate) fn seed_date(&mut self, date: NaiveDate) {
        let bucket: Vec<Task> = self
            .items
            .iter()
            .filter(|task| task.occupies(date))
            .cloned()
            .collect();
        self.by_date.insert(date, bucket);
    }

    /// Install a freshly fetched bucket and merge its tasks into the
    /// primary cache, evicting any stale entries for that date first.
    pub(crate) fn merge_date(&mut self, date: NaiveDate, fetched: Vec<Task>) {
        self.items.retain(|task| !task.occupies(date));
        self.items.extend(fetched.iter().cloned());
        self.by_date.insert(date, fetched);
    }

    /// Append to the primary cache and to whichever index buckets already
    /// exist for the task's dates.
    pub(crate) fn insert(&mut self, task: Task) {
        self.index_into_existing(&task);
        self.items.push(task);
    }

    /// Guarded index write: only buckets already present are touched, and
    /// a deadline equal to the scheduled date is not double-inserted.
    pub(crate) fn index_into_existing(&mut self, task: &Task) {
        let mut keys = vec![task.scheduled_date];
        if let Some(deadline) = task.dead_line
            && deadline != task.scheduled_date
        {
            keys.push(deadline);
        }
        for key in keys {
            if let Some(bucket) = self.by_date.get_mut(&key) {
                bucket.push(task.clone());
            }
        }
    }

    /// Remove a task id from the buckets keyed by its (old) dates.
    pub(crate) fn unindex(&mut self, id: i64, scheduled: NaiveDate, dead_line: Option<NaiveDate>) {
        let mut keys = vec![scheduled];
        if let Some(deadline) = dead_line {
            keys.push(deadline);
        }
        for key in keys {
            if let Some(bucket) = self.by_date.get_mut(&key) {
                bucket.retain(|task| task.id != id);
            }
        }
    }

    /// Replace the cached task with the server's version, moving it
    /// between index buckets as its dates dictate. Returns the previous
    /// (scheduled, deadline, category) triple, or `None` when the id is
    /// not cached.
    pub(crate) fn commit_update(
        &mut self,
        id: i64,
        fresh: Task,
    ) -> Option<(NaiveDate, Option<NaiveDate>, Option<i64>)> {
        let slot = self.items.iter_mut().find(|task| task.id == id)?;
        let old = (slot.scheduled_date, slot.dead_line, slot.category);
        *slot = fresh.clone();
        self.unindex(id, old.0, old.1);
        self.index_into_existing(&fresh);
        Some(old)
    }

    /// Remove from the primary cache and every index bucket that held it.
    pub(crate) fn remove(&mut self, id: i64) -> Option<Task> {
        let idx = self.items.iter().position(|task| task.id == id)?;
        let task = self.items.remove(idx);
        self.unindex(id, task.scheduled_date, task.dead_line);
        Some(task)
    }

    /// Apply `patch` to one task everywhere it is cached (primary cache
    /// and all index buckets). Returns false when the id is not in the
    /// primary cache.
    pub(crate) fn patch_task(&mut self, id: i64, mut patch: impl FnMut(&mut Task)) -> bool {
        let mut found = false;
        if let Some(task) = self.items.iter_mut().find(|task| task.id == id) {
            patch(task);
            found = true;
        }
        for bucket in self.by_date.values_mut() {
            if let Some(task) = bucket.iter_mut().find(|task| task.id == id) {
                patch(task);
            }
        }
        found
    }

    /// Apply `patch` to every cached task, primary and indexed copies
    /// alike. This is the seam other stores use for cross-entity rules.
    pub(crate) fn patch_all(&mut self, patch: impl Fn(&mut Task)) {
        for task in &mut self.items {
            patch(task);
        }
        for bucket in self.by_date.values_mut() {
            for task in bucket {
                patch(task);
            }
        }
    }

    /// Drop a deleted tag from every task's embedded tag list.
    pub fn strip_tag(&mut self, tag_id: i64) {
        self.patch_all(|task| task.tags.retain(|tag| tag.id != tag_id));
    }

    /// Replace the embedded snapshot of a renamed tag everywhere.
    pub fn apply_tag(&mut self, tag: &crate::model::Tag) {
        self.patch_all(|task| {
            for slot in &mut task.tags {
                if slot.id == tag.id {
                    *slot = tag.clone();
                }
            }
        });
    }

    /// Orphan tasks belonging to a deleted category: the tasks stay, the
    /// reference goes.
    pub fn orphan_category(&mut self, category: i64) {
        self.patch_all(|task| {
            if task.category == Some(category) {
                task.category = None;
            }
        });
    }

    /// Today-scoped count for one category (strict date match, per the
    /// list counters shown in the UI).
    pub fn count_for_category(&self, category: i64, today: NaiveDate) -> u64 {
        self.items
            .iter()
            .filter(|task| task.category == Some(category) && task.occupies(today))
            .count() as u64
    }

    // Derived views.

    pub fn completed(&self, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.is_completed && task.relevant_on(today))
            .collect()
    }

    pub fn pending(&self, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| !task.is_completed && task.relevant_on(today))
            .collect()
    }

    pub fn today(&self, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.relevant_on(today))
            .collect()
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| {
                !task.is_completed && task.dead_line.is_some_and(|deadline| deadline < today)
            })
            .collect()
    }

    pub fn upcoming(&self, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.scheduled_date > today)
            .collect()
    }

    pub fn by_category(&self, category: Option<i64>, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.category == category && task.relevant_on(today))
            .collect()
    }

    pub fn by_priority(&self, priority: Priority, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.priority_level == priority && task.relevant_on(today))
            .collect()
    }

    pub fn by_tag(&self, tag_id: i64, today: NaiveDate) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| task.has_tag(tag_id) && task.occupies(today))
            .collect()
    }

    pub fn stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats {
            total: self.items.len(),
            completed: self.completed(today).len(),
            pending: self.pending(today).len(),
            overdue: self.overdue(today).len(),
        }
    }

    pub fn search(&self, query: &str) -> Vec<&Task> {
        let needle = query.to_lowercase();
        self.items
            .iter()
            .filter(|task| {
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
                    || task
                        .tags
                        .iter()
                        .any(|tag| tag.title.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

impl App {
    /// Record a task-store failure: error flag, notification, message.
    pub(crate) fn task_failure(&mut self, key: MessageKey) -> String {
        let message = self.message(key).to_string();
        self.tasks.error = Some(message.clone());
        self.notifier.error(message.clone());
        message
    }

    /// Replace the whole task collection with the server's listing and
    /// warm the date index for today and tomorrow. Fails soft.
    #[instrument(skip(self))]
    pub async fn fetch_all(&mut self) {
        self.tasks.loading = true;
        self.tasks.error = None;
        match self.gateway.list_tasks().await {
            Ok(listing) => {
                debug!(count = listing.len(), "task listing fetched");
                self.tasks.replace_all(listing);
                let now = today();
                self.tasks.seed_date(now);
                if let Some(tomorrow) = now.checked_add_days(Days::new(1)) {
                    self.tasks.seed_date(tomorrow);
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch tasks");
                self.task_failure(MessageKey::FetchingTasks);
            }
        }
        self.tasks.loading = false;
    }

    /// Memoized per-date fetch: an already-indexed date returns without a
    /// network call. Fails soft.
    #[instrument(skip(self))]
    pub async fn fetch_by_date(&mut self, date: NaiveDate) {
        if self.tasks.has_date(date) {
            debug!(%date, "date already indexed, skipping fetch");
            return;
        }
        self.tasks.loading = true;
        self.tasks.error = None;
        match self.gateway.tasks_for_date(date).await {
            Ok(fetched) => {
                debug!(%date, count = fetched.len(), "date bucket fetched");
                self.tasks.merge_date(date, fetched);
            }
            Err(err) => {
                warn!(error = %err, %date, "failed to fetch tasks for date");
                self.task_failure(MessageKey::FetchingTasks);
            }
        }
        self.tasks.loading = false;
    }

    /// Create a task. No optimistic insert: the cache changes only after
    /// the server acknowledges, using its authoritative copy.
    #[instrument(skip(self, payload))]
    pub async fn create_task(&mut self, payload: TaskPayload) -> StoreResult<i64> {
        self.tasks.error = None;
        match self.gateway.create_task(&payload).await {
            Ok(task) => {
                let id = task.id;
                let category = task.category;
                self.tasks.insert(task);
                self.recount_category(category);
                debug!(id, "task created");
                Ok(id)
            }
            Err(err) => {
                warn!(error = %err, "failed to create task");
                self.task_failure(MessageKey::CreatingTask);
                Err(err)
            }
        }
    }

    /// Full replacement update. The cached task becomes the server's
    /// response with a locally stamped `updated_at`; the date index and
    /// category counters follow the old→new delta.
    #[instrument(skip(self, payload))]
    pub async fn update_task(&mut self, id: i64, payload: TaskPayload) -> StoreResult<()> {
        self.tasks.error = None;
        let server = match self.gateway.replace_task(id, &payload).await {
            Ok(task) => task,
            Err(err) => {
                warn!(error = %err, id, "failed to update task");
                self.task_failure(MessageKey::UpdatingTask);
                return Err(err);
            }
        };

        let mut fresh = server;
        fresh.id = id;
        fresh.updated_at = Utc::now();
        let new_category = fresh.category;

        let Some((_, _, old_category)) = self.tasks.commit_update(id, fresh) else {
            self.task_failure(MessageKey::UpdatingTask);
            return Err(StoreError::NotFoundLocal { kind: "task", id });
        };

        if old_category != new_category {
            self.recount_category(old_category);
            self.recount_category(new_category);
        }
        debug!(id, "task updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_task(&mut self, id: i64) -> StoreResult<()> {
        self.tasks.error = None;
        if let Err(err) = self.gateway.delete_task(id).await {
            warn!(error = %err, id, "failed to delete task");
            self.task_failure(MessageKey::DeletingTask);
            return Err(err);
        }
        let Some(gone) = self.tasks.remove(id) else {
            self.task_failure(MessageKey::DeletingTask);
            return Err(StoreError::NotFoundLocal { kind: "task", id });
        };
        self.recount_category(gone.category);
        debug!(id, "task deleted");
        Ok(())
    }

    /// Flip completion through the dedicated toggle endpoint. Local state
    /// changes only after the call succeeds; `updated_at` comes from the
    /// server receipt when present, else the local clock.
    #[instrument(skip(self))]
    pub async fn toggle_completion(&mut self, id: i64) -> StoreResult<bool> {
        let Some(task) = self.tasks.get(id) else {
            self.task_failure(MessageKey::UpdatingTask);
            return Err(StoreError::NotFoundLocal { kind: "task", id });
        };
        let next = !task.is_completed;

        let receipt = match self.gateway.set_task_completion(id, next).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(error = %err, id, "failed to toggle completion");
                self.task_failure(MessageKey::UpdatingTask);
                return Err(err);
            }
        };

        let stamp = receipt.updated_at.unwrap_or_else(Utc::now);
        self.tasks.patch_task(id, |task| {
            task.is_completed = next;
            task.updated_at = stamp;
        });
        debug!(id, completed = next, "completion toggled");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn task(id: i64, scheduled: &str, dead_line: Option<&str>) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: String::new(),
            category: None,
            priority_level: Priority::Medium,
            scheduled_date: date(scheduled),
            dead_line: dead_line.map(date),
            start_time: None,
            end_time: None,
            is_completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sub_tasks: vec![],
            tags: vec![],
        }
    }

    #[test]
    fn insert_only_touches_existing_buckets() {
        let mut store = TaskStore::default();
        store.seed_date(date("2024-06-01"));

        store.insert(task(1, "2024-06-01", None));
        store.insert(task(2, "2024-06-02", None));

        assert_eq!(store.tasks_for_date(date("2024-06-01")).len(), 1);
        assert!(!store.has_date(date("2024-06-02")));
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn deadline_equal_to_schedule_is_indexed_once() {
        let mut store = TaskStore::default();
        store.seed_date(date("2024-06-01"));
        store.insert(task(1, "2024-06-01", Some("2024-06-01")));
        assert_eq!(store.tasks_for_date(date("2024-06-01")).len(), 1);
    }

    #[test]
    fn commit_update_moves_between_buckets() {
        let mut store = TaskStore::default();
        store.seed_date(date("2024-06-01"));
        store.seed_date(date("2024-06-02"));
        store.insert(task(1, "2024-06-01", None));

        let old = store
            .commit_update(1, task(1, "2024-06-02", None))
            .expect("task cached");
        assert_eq!(old.0, date("2024-06-01"));
        assert!(store.tasks_for_date(date("2024-06-01")).is_empty());
        assert_eq!(store.tasks_for_date(date("2024-06-02")).len(), 1);
    }

    #[test]
    fn remove_clears_every_bucket() {
        let mut store = TaskStore::default();
        store.seed_date(date("2024-06-01"));
        store.seed_date(date("2024-06-03"));
        store.insert(task(1, "2024-06-01", Some("2024-06-03")));

        store.remove(1).expect("task cached");
        assert!(store.tasks_for_date(date("2024-06-01")).is_empty());
        assert!(store.tasks_for_date(date("2024-06-03")).is_empty());
        assert!(store.all().is_empty());
    }

    #[test]
    fn strip_tag_reaches_indexed_copies() {
        let mut store = TaskStore::default();
        store.seed_date(date("2024-06-01"));
        let mut t = task(1, "2024-06-01", None);
        t.tags.push(Tag {
            id: 9,
            title: "urgent".into(),
        });
        store.insert(t);

        store.strip_tag(9);
        assert!(store.get(1).expect("cached").tags.is_empty());
        assert!(store.tasks_for_date(date("2024-06-01"))[0].tags.is_empty());
    }

    #[test]
    fn merge_date_evicts_stale_entries_first() {
        let mut store = TaskStore::default();
        store.replace_all(vec![task(1, "2024-06-01", None), task(2, "2024-06-05", None)]);

        store.merge_date(date("2024-06-01"), vec![task(3, "2024-06-01", None)]);

        assert!(store.get(1).is_none());
        assert!(store.get(2).is_some());
        assert!(store.get(3).is_some());
        assert_eq!(store.tasks_for_date(date("2024-06-01")).len(), 1);
    }

    #[test]
    fn count_for_category_is_today_scoped() {
        let mut store = TaskStore::default();
        let today = date("2024-06-01");
        let mut a = task(1, "2024-06-01", None);
        a.category = Some(5);
        let mut b = task(2, "2024-07-01", None);
        b.category = Some(5);
        store.replace_all(vec![a, b]);

        assert_eq!(store.count_for_category(5, today), 1);
    }
}
