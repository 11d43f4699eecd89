use async_trait::async_trait;
use log::info;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::Config;
use crate::errors::{StoreError, WikiError};
use crate::types::Page;

use super::{page_from_lookup, pages_from_search, saved, schema_created, PageStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS pages (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    title VARCHAR(255) COLLATE utf8mb4_bin NOT NULL,
    body LONGBLOB NOT NULL,
    UNIQUE KEY pages_title (title)
) DEFAULT CHARSET = utf8mb4";

// Relies on the unique key on `title`; without it MySQL inserts duplicates.
// The body is bound a second time for the update so the statement avoids
// VALUES() in the update clause, which MySQL 8.0.20 deprecates, and the row
// alias form that MariaDB does not accept.
const UPSERT: &str =
    "INSERT INTO pages (title, body) VALUES (?, ?) ON DUPLICATE KEY UPDATE body = ?";

/// Page store backed by a MySQL (or MariaDB) connection pool
#[derive(Clone)]
pub struct MySqlPageStore {
    pool: MySqlPool,
}

impl MySqlPageStore {
    /// Connect using the `dbaddr`/`dbuser`/`dbpass`/`dbname` settings.
    /// Opening the pool establishes a first connection, so an unreachable
    /// server fails here.
    pub async fn connect(config: &Config) -> Result<Self, WikiError> {
        let (host, port) = config.mysql_host_port()?;
        let options = MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&config.dbuser)
            .password(&config.dbpass)
            .database(&config.dbname);

        info!("Connecting to MySQL at {}:{} (database '{}')", host, port, config.dbname);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::backend(format!("connect to {}:{}", host, port), e))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for MySqlPageStore {
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
            // INSTR rather than LIKE so `%` and `_` match literally
            sqlx::query("SELECT id, title, body FROM pages WHERE INSTR(title, ?) > 0 OR INSTR(body, ?) > 0")
                .bind(text)
                .bind(text)
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

    /// Connection URL of a disposable MySQL or MariaDB database. Tests that
    /// need a live server return early when it is unset.
    const TEST_URL_VAR: &str = "SQLWIKI_TEST_MYSQL_URL";

    async fn live_store() -> Option<MySqlPageStore> {
        let url = std::env::var(TEST_URL_VAR).ok()?;
        let pool = MySqlPool::connect(&url).await.unwrap();
        let store = MySqlPageStore::from_pool(pool);
        store.create_schema().await.unwrap();
        for title in ["SqlwikiUpsert", "SqlwikiPercent"] {
            sqlx::query("DELETE FROM pages WHERE title = ?")
                .bind(title)
                .execute(&store.pool)
                .await
                .unwrap();
        }
        Some(store)
    }

    #[test]
    fn upsert_binds_body_for_update() {
        assert!(!UPSERT.contains("VALUES(body)"));
        assert_eq!(UPSERT.matches('?').count(), 3);
    }

    #[tokio::test]
    async fn live_upsert_load_and_search() {
        let Some(store) = live_store().await else {
            return;
        };

        store.save(&Page::new("SqlwikiUpsert", "first")).await.unwrap();
        let first = store.load("SqlwikiUpsert").await.unwrap();
        store.save(&Page::new("SqlwikiUpsert", vec![0u8, 255, 1])).await.unwrap();
        let second = store.load("SqlwikiUpsert").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.body, vec![0u8, 255, 1]);

        assert!(store.load("sqlwikiupsert").await.unwrap_err().is_not_found());

        store.save(&Page::new("SqlwikiPercent", "sqlwiki 100% literal")).await.unwrap();
        let hits = store.search("sqlwiki 100%").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "SqlwikiPercent");
        assert!(store.search("sqlwiki 1_0%").await.unwrap().is_empty());

        store.close().await;
    }
}
