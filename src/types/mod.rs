use std::sync::Arc;

use crate::components::TemplateComponent;
use crate::services::Dispatcher;
use crate::store::PageStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub templates: Arc<TemplateComponent>,
}

impl AppState {
    pub fn new(store: Arc<dyn PageStore>, templates: TemplateComponent) -> Self {
        Self {
            dispatcher: Dispatcher::new(store),
            templates: Arc::new(templates),
        }
    }
}

/// A wiki page as loaded from, or about to be written to, the store.
///
/// `id` is assigned by the store and stays `None` until the page has been
/// persisted. `links` is only filled for search-result rendering and is never
/// written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub id: Option<i64>,
    pub title: String,
    pub body: Vec<u8>,
    pub links: Vec<String>,
}

impl Page {
    /// Create an unsaved page
    pub fn new(title: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            title: title.into(),
            body: body.into(),
            links: Vec::new(),
        }
    }

    /// Empty edit scaffold for a title that has no stored page yet
    pub fn scaffold(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Which template a rendered outcome goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    View,
    Edit,
    Search,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::View, Template::Edit, Template::Search];

    pub fn name(self) -> &'static str {
        match self {
            Template::View => "view",
            Template::Edit => "edit",
            Template::Search => "search",
        }
    }
}

/// Form fields a request may carry. Both save and search read `body`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WikiForm {
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffold_is_unsaved_and_empty() {
        let page = Page::scaffold("Test");
        assert_eq!(page.title, "Test");
        assert!(page.body.is_empty());
        assert_eq!(page.id, None);
        assert!(page.links.is_empty());
    }

    #[test]
    fn body_text_is_lossy() {
        let page = Page::new("Bin", vec![b'o', b'k', 0xff]);
        assert_eq!(page.body_text(), "ok\u{fffd}");
    }
}
