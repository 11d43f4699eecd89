use std::str::FromStr;

use async_trait::async_trait;
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::errors::{StoreError, WikiError};
use crate::types::Page;

use super::{page_from_lookup, pages_from_search, saved, schema_created, PageStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    body BLOB NOT NULL
)";

const UPSERT: &str =
    "INSERT INTO pages (title, body) VALUES (?, ?) ON CONFLICT(title) DO UPDATE SET body = excluded.body";

/// Page store backed by a SQLite database file
#[derive(Clone)]
pub struct SqlitePageStore {
    pool: SqlitePool,
}

impl SqlitePageStore {
    /// Open (creating if missing) the database file named by `dbpath`
    pub async fn connect(config: &Config) -> Result<Self, WikiError> {
        let path = config
            .dbpath
            .as_ref()
            .ok_or_else(|| WikiError::Config("sqlite backend requires \"dbpath\"".to_string()))?;

        info!("Opening SQLite database {:?}", path);
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::backend(format!("open {:?}", path), e))?;

        Ok(Self::from_pool(pool))
    }

    /// Private in-memory database, schema included. The pool holds a single
    /// connection that is never recycled, since the database lives and dies
    /// with it.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::backend("open in-memory database", e))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::backend("open in-memory database", e))?;

        let store = Self::from_pool(pool);
        store.create_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for SqlitePageStore {
    async fn load(&self, title: &str) -> Result<Page, StoreError> {
        let found = sqlx::query("SELECT id, title, body FROM pages WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await;
        page_from_lookup(title, found)
    }

    async fn save(&self, page: &Page) -> Result<(), StoreError> {
        let result = sqlx::query(UPSERT)
            .bind(&page.title)
            .bind(&page.body)
            .execute(&self.pool)
            .await;
        saved(page, result)
    }

    async fn search(&self, text: &str) -> Result<Vec<Page>, StoreError> {
        let rows = if text.is_empty() {
            sqlx::query("SELECT id, title, body FROM pages")
                .fetch_all(&self.pool)
                .await
        } else {
            // The needle is bound as a blob for the body so instr() compares bytes
            sqlx::query("SELECT id, title, body FROM pages WHERE instr(title, ?) > 0 OR instr(body, ?) > 0")
                .bind(text)
                .bind(text.as_bytes())
                .fetch_all(&self.pool)
                .await
        };
        pages_from_search(text, rows)
    }

    async fn create_schema(&self) -> Result<(), StoreError> {
        schema_created(sqlx::query(SCHEMA).execute(&self.pool).await)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlitePageStore {
        SqlitePageStore::in_memory().await.unwrap()
    }

    fn titles(pages: &[Page]) -> Vec<String> {
        let mut titles: Vec<String> = pages.iter().map(|p| p.title.clone()).collect();
        titles.sort();
        titles
    }

    #[tokio::test]
    async fn load_missing_title_is_not_found() {
        let store = store().await;
        match store.load("Nowhere").await {
            Err(StoreError::NotFound(title)) => assert_eq!(title, "Nowhere"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn save_then_load() {
        let store = store().await;
        store.save(&Page::new("Home", "Welcome")).await.unwrap();

        let page = store.load("Home").await.unwrap();
        assert_eq!(page.title, "Home");
        assert_eq!(page.body, b"Welcome");
        assert!(page.id.is_some());
        assert!(page.links.is_empty());
    }

    #[tokio::test]
    async fn load_is_exact_match() {
        let store = store().await;
        store.save(&Page::new("Home", "Welcome")).await.unwrap();
        assert!(store.load("home").await.unwrap_err().is_not_found());
        assert!(store.load("Hom").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn second_save_replaces_body_and_keeps_id() {
        let store = store().await;
        store.save(&Page::new("Home", "first")).await.unwrap();
        let first = store.load("Home").await.unwrap();

        store.save(&Page::new("Home", "second")).await.unwrap();
        let second = store.load("Home").await.unwrap();

        assert_eq!(second.body, b"second");
        assert_eq!(second.id, first.id);
        assert_eq!(store.search("").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn binary_bodies_survive() {
        let store = store().await;
        let body = vec![0u8, 159, 146, 150, 255];
        store.save(&Page::new("Blob", body.clone())).await.unwrap();
        assert_eq!(store.load("Blob").await.unwrap().body, body);
    }

    #[tokio::test]
    async fn empty_search_matches_everything() {
        let store = store().await;
        for title in ["A", "B", "C"] {
            store.save(&Page::new(title, "x")).await.unwrap();
        }
        assert_eq!(titles(&store.search("").await.unwrap()), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn search_matches_title_or_body() {
        let store = store().await;
        store.save(&Page::new("RustNotes", "ownership")).await.unwrap();
        store.save(&Page::new("Cooking", "rust on the pan")).await.unwrap();
        store.save(&Page::new("Garden", "tomatoes")).await.unwrap();

        assert_eq!(titles(&store.search("Rust").await.unwrap()), ["RustNotes"]);
        assert_eq!(titles(&store.search("rust").await.unwrap()), ["Cooking"]);
        assert_eq!(titles(&store.search("o").await.unwrap()), ["Cooking", "Garden", "RustNotes"]);
        assert!(store.search("absent").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let store = store().await;
        store.save(&Page::new("Percent", "100% done")).await.unwrap();
        store.save(&Page::new("Under", "snake_case")).await.unwrap();
        store.save(&Page::new("Plain", "nothing special")).await.unwrap();

        assert_eq!(titles(&store.search("%").await.unwrap()), ["Percent"]);
        assert_eq!(titles(&store.search("_").await.unwrap()), ["Under"]);
        assert_eq!(titles(&store.search("e_c").await.unwrap()), ["Under"]);
        assert!(store.search("n%g").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_pool_reports_backend_error() {
        let store = store().await;
        store.close().await;
        match store.load("Home").await {
            Err(StoreError::Backend { context, .. }) => assert!(context.contains("Home")),
            other => panic!("expected Backend error, got {:?}", other),
        }
        assert!(matches!(store.search("x").await, Err(StoreError::Backend { .. })));
    }
}
