//! User-facing message catalog.
//!
//! Store actions never format ad-hoc error strings; they look up a
//! [`MessageKey`] in the catalog carried by the app context. The language
//! is an explicit field, not ambient state.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    FetchingTasks,
    CreatingTask,
    UpdatingTask,
    DeletingTask,
    FetchingTags,
    CreatingTag,
    UpdatingTag,
    DeletingTag,
    TagAlreadyExists,
    FetchingLists,
    CreatingList,
    UpdatingList,
    DeletingList,
    ListAlreadyExists,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Persian,
}

impl Language {
    /// Resolve a config-file language tag; anything unknown falls back to
    /// English.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "fa" | "fa-ir" | "persian" => Language::Persian,
            _ => Language::English,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    lang: Language,
}

impl Catalog {
    pub fn new(lang: Language) -> Self {
        Self { lang }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    /// Localized text for `key`, falling back to English and then to the
    /// generic message.
    pub fn text(&self, key: MessageKey) -> &'static str {
        lookup(self.lang, key)
            .or_else(|| lookup(Language::English, key))
            .unwrap_or("An error occurred")
    }
}

fn lookup(lang: Language, key: MessageKey) -> Option<&'static str> {
    use MessageKey::*;
    let text = match lang {
        Language::English => match key {
            FetchingTasks => "Error fetching tasks",
            CreatingTask => "Error creating task",
            UpdatingTask => "Error updating task",
            DeletingTask => "Error deleting task",
            FetchingTags => "Error fetching tags",
            CreatingTag => "Error creating tag",
            UpdatingTag => "Error updating tag",
            DeletingTag => "Error deleting tag",
            TagAlreadyExists => "The tag already exists",
            FetchingLists => "Error fetching task lists",
            CreatingList => "Error creating task list",
            UpdatingList => "Error updating task list",
            DeletingList => "Error deleting task list",
            ListAlreadyExists => "The list already exists",
            Generic => "An error occurred",
        },
        Language::Persian => match key {
            FetchingTasks => "خطا در دریافت وظایف",
            CreatingTask => "خطا در ایجاد وظیفه",
            UpdatingTask => "خطا در به‌روزرسانی وظیفه",
            DeletingTask => "خطا در حذف وظیفه",
            FetchingTags => "خطا در دریافت برچسب‌ها",
            CreatingTag => "خطا در ایجاد برچسب",
            UpdatingTag => "خطا در به‌روزرسانی برچسب",
            DeletingTag => "خطا در حذف برچسب",
            TagAlreadyExists => "این برچسب قبلاً وجود دارد",
            FetchingLists => "خطا در دریافت فهرست‌ها",
            CreatingList => "خطا در ایجاد فهرست",
            UpdatingList => "خطا در به‌روزرسانی فهرست",
            DeletingList => "خطا در حذف فهرست",
            ListAlreadyExists => "این فهرست قبلاً وجود دارد",
            Generic => "خطایی رخ داده است",
        },
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_is_the_default_language() {
        assert_eq!(Language::from_tag("en"), Language::English);
        assert_eq!(Language::from_tag("de"), Language::English);
        assert_eq!(Language::from_tag("fa"), Language::Persian);
    }

    #[test]
    fn conflict_messages_differ_from_generic_creation_errors() {
        let catalog = Catalog::new(Language::English);
        assert_ne!(
            catalog.text(MessageKey::TagAlreadyExists),
            catalog.text(MessageKey::CreatingTag)
        );
        assert_ne!(
            catalog.text(MessageKey::ListAlreadyExists),
            catalog.text(MessageKey::CreatingList)
        );
    }

    #[test]
    fn persian_catalog_is_complete_for_task_errors() {
        let catalog = Catalog::new(Language::Persian);
        assert!(catalog.text(MessageKey::FetchingTasks).contains("خطا"));
        assert!(!catalog.text(MessageKey::TagAlreadyExists).is_empty());
    }
}
