pub mod dispatcher;
pub mod markdown_service;

pub use dispatcher::{Dispatcher, Outcome, SEARCH_UNAVAILABLE};
pub use markdown_service::{MarkdownResult, MarkdownService};
