//! Page persistence
//!
//! A [`PageStore`] owns the `pages` table: exact-title lookup, upsert keyed by
//! title, and substring search over title and body. Backends live in their own
//! modules and only build and bind their SQL; decoding rows and mapping driver
//! results onto [`StoreError`] is shared from here.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sqlx::{ColumnIndex, Decode, Row, Type};

use crate::config::{Backend, Config};
use crate::errors::{StoreError, WikiError};
use crate::types::Page;

pub mod mysql;
pub mod sqlite;

pub use mysql::MySqlPageStore;
pub use sqlite::SqlitePageStore;

/// Durable keyed storage of pages.
///
/// Implementations are shared between request tasks, so every method takes
/// `&self` and returns freshly owned values.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Load the page stored under exactly `title`.
    ///
    /// Fails with [`StoreError::NotFound`] when no row matches.
    async fn load(&self, title: &str) -> Result<Page, StoreError>;

    /// Insert the page, or replace the body of the row with the same title.
    /// The stored id of an existing row never changes.
    async fn save(&self, page: &Page) -> Result<(), StoreError>;

    /// Every page whose title or body contains `text`. An empty `text` matches
    /// every page. Order is whatever the backend returns.
    async fn search(&self, text: &str) -> Result<Vec<Page>, StoreError>;

    /// Create the `pages` table with a unique title constraint if it is missing.
    async fn create_schema(&self) -> Result<(), StoreError>;

    /// Release all pooled connections
    async fn close(&self);
}

/// Open the backend selected in the configuration
pub async fn connect(config: &Config) -> Result<Arc<dyn PageStore>, WikiError> {
    let store: Arc<dyn PageStore> = match config.backend {
        Backend::Mysql => Arc::new(MySqlPageStore::connect(config).await?),
        Backend::Sqlite => Arc::new(SqlitePageStore::connect(config).await?),
    };
    Ok(store)
}

/// Decode a full `(id, title, body)` row. A row that fails any column is
/// rejected whole.
pub(crate) fn page_from_row<'r, R>(row: &'r R) -> Result<Page, sqlx::Error>
where
    R: Row,
    &'static str: ColumnIndex<R>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    let id: i64 = row.try_get("id")?;
    let title: String = row.try_get("title")?;
    let body: Vec<u8> = row.try_get("body")?;
    Ok(Page { id: Some(id), title, body, links: Vec::new() })
}

/// Map an exact-title lookup onto the page or [`StoreError::NotFound`]
pub(crate) fn page_from_lookup<R>(
    title: &str,
    found: Result<Option<R>, sqlx::Error>,
) -> Result<Page, StoreError>
where
    R: Row,
    &'static str: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    match found.map_err(|e| StoreError::backend(format!("load page {:?}", title), e))? {
        Some(row) => page_from_row(&row)
            .map_err(|e| StoreError::backend(format!("decode page {:?}", title), e)),
        None => {
            debug!("No stored page titled '{}'", title);
            Err(StoreError::NotFound(title.to_string()))
        }
    }
}

/// Map search rows onto pages; one undecodable row fails the whole search
pub(crate) fn pages_from_search<R>(
    text: &str,
    rows: Result<Vec<R>, sqlx::Error>,
) -> Result<Vec<Page>, StoreError>
where
    R: Row,
    &'static str: ColumnIndex<R>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    let context = || format!("search for {:?}", text);
    let rows = rows.map_err(|e| StoreError::backend(context(), e))?;
    rows.iter()
        .map(|row| page_from_row(row).map_err(|e| StoreError::backend(context(), e)))
        .collect()
}

pub(crate) fn saved<T>(page: &Page, result: Result<T, sqlx::Error>) -> Result<(), StoreError> {
    result.map_err(|e| StoreError::backend(format!("save page {:?}", page.title), e))?;
    debug!("Saved page '{}' ({} bytes)", page.title, page.body.len());
    Ok(())
}

pub(crate) fn schema_created<T>(result: Result<T, sqlx::Error>) -> Result<(), StoreError> {
    result.map_err(|e| StoreError::backend("create schema", e))?;
    Ok(())
}
