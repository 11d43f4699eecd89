use std::sync::Arc;

use log::{debug, error, info};

use crate::errors::{StoreError, WikiError};
use crate::router::Route;
use crate::store::PageStore;
use crate::types::{Page, WikiForm};

/// Shown on the search page when the store could not answer
pub const SEARCH_UNAVAILABLE: &str = "Search is unavailable right now. The result list below may be incomplete.";

/// What a dispatched request resolves to, before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 302 to another wiki path
    Redirect(String),
    /// Render a stored page
    View(Page),
    /// Render the edit form; an unsaved scaffold when the page is new
    Edit(Page),
    /// Search results; `page.links` holds the matching titles. `notice` is set
    /// when the search itself failed and the list is empty for that reason.
    Search { query: String, page: Page, notice: Option<String> },
}

/// Maps decoded routes onto page store calls.
///
/// Holds nothing but the store handle, so one dispatcher serves every request.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn PageStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self { store }
    }

    pub async fn dispatch(&self, route: Route, form: WikiForm) -> Result<Outcome, WikiError> {
        debug!("Dispatching {} for '{}'", route.action(), route.title());
        match route {
            Route::View(title) => self.view(title).await,
            Route::Edit(title) => self.edit(title).await,
            Route::Save(title) => self.save(title, form.body).await,
            Route::Search(_) => Ok(self.search(form.body).await),
        }
    }

    /// A missing page sends the client to its edit form
    async fn view(&self, title: String) -> Result<Outcome, WikiError> {
        match self.store.load(&title).await {
            Ok(page) => Ok(Outcome::View(page)),
            Err(StoreError::NotFound(_)) => {
                info!("Page '{}' does not exist yet, redirecting to edit", title);
                Ok(Outcome::Redirect(Route::Edit(title).path()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A missing page is the entry point for creating it
    async fn edit(&self, title: String) -> Result<Outcome, WikiError> {
        let page = match self.store.load(&title).await {
            Ok(page) => page,
            Err(StoreError::NotFound(_)) => {
                debug!("Editing new page '{}'", title);
                Page::scaffold(title)
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Outcome::Edit(page))
    }

    async fn save(&self, title: String, body: String) -> Result<Outcome, WikiError> {
        let page = Page::new(title, body);
        self.store.save(&page).await?;
        info!("Saved page '{}'", page.title);
        Ok(Outcome::Redirect(Route::View(page.title).path()))
    }

    /// Store failures are logged and reported through the notice rather than
    /// failing the request
    async fn search(&self, query: String) -> Outcome {
        let (links, notice) = match self.store.search(&query).await {
            Ok(pages) => {
                info!("Search for '{}' matched {} pages", query, pages.len());
                (pages.into_iter().map(|p| p.title).collect(), None)
            }
            Err(e) => {
                error!("Search for '{}' failed: {}", query, e);
                (Vec::new(), Some(SEARCH_UNAVAILABLE.to_string()))
            }
        };

        let page = Page { links, ..Page::scaffold("search") };
        Outcome::Search { query, page, notice }
    }
}
