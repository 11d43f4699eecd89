//! sqlwiki - a small wiki that keeps its pages in a SQL table
//!
//! Request paths of the form `/<action>/<title>` are decoded by the [`router`],
//! turned into store calls by the [`services::Dispatcher`] and rendered through
//! the view, edit and search templates. Pages live in a `pages` table on MySQL
//! or SQLite behind the [`store::PageStore`] trait.

pub mod components;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod router;
pub mod services;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::{Backend, Config};
pub use errors::{RouteMismatch, StoreError, WikiError};
pub use router::Route;
pub use services::{Dispatcher, MarkdownService, Outcome};
pub use store::{MySqlPageStore, PageStore, SqlitePageStore};
pub use types::{AppState, Page, Template, WikiForm};
pub use components::TemplateComponent;
