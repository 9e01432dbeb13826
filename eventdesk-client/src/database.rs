use crate::mirror::Mirror;
use async_trait::async_trait;
use eyre::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use time::OffsetDateTime;
use tracing::debug;

/// SQLite backed mirror.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SlotInfo {
    pub name: String,
    pub size: i64,
    pub updated_at: i64,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening database at {:?}", path);
        if !path.exists() {
            if let Some(dir) = path.parent() {
                fs_err::create_dir_all(dir)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Self::setup_db(&pool).await?;

        Ok(Self { pool })
    }

    async fn setup_db(pool: &SqlitePool) -> Result<()> {
        debug!("setting up database");
        sqlx::migrate!("./migrations").run(pool).await?;

        Ok(())
    }

    /// Every slot with the size of its payload, for diagnostics.
    pub async fn slots(&self) -> Result<Vec<SlotInfo>> {
        let res = sqlx::query_as(
            "select name, length(value) as size, updated_at from slots order by name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(res)
    }
}

#[async_trait]
impl Mirror for Database {
    async fn read(&self, slot: &str) -> Result<Option<String>> {
        let res: Option<(String,)> = sqlx::query_as("select value from slots where name = ?1")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        Ok(res.map(|x| x.0))
    }

    async fn write(&self, slot: &str, value: &str) -> Result<()> {
        debug!("writing mirror slot {slot}");
        sqlx::query(
            r#"
            insert into slots(name, value, updated_at)
            values(?1, ?2, ?3)
            on conflict(name) do update set
                value = ?2,
                updated_at = ?3
            "#,
        )
        .bind(slot)
        .bind(value)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<()> {
        sqlx::query("delete from slots where name = ?1")
            .bind(slot)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
