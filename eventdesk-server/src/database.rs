use eventdesk_common::collection::Collection;
use eyre::Result;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use time::OffsetDateTime;
use tracing::debug;

/// A stored record: the JSON object as last written, always carrying a string `id`.
pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("document not found")]
    NotFound,

    #[error("document already exists")]
    Conflict,

    #[error("stored document is not a JSON object: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn decode(body: &str) -> Result<Document, DbError> {
    Ok(serde_json::from_str(body)?)
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

    /// Documents of a collection in insertion order.
    pub async fn list(&self, collection: Collection) -> Result<Vec<Document>, DbError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("select body from documents where collection = ?1 order by seq")
                .bind(collection.path())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(|(body,)| decode(body)).collect()
    }

    pub async fn get(&self, collection: Collection, id: &str) -> Result<Document, DbError> {
        let row: Option<(String,)> =
            sqlx::query_as("select body from documents where collection = ?1 and id = ?2")
                .bind(collection.path())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((body,)) => decode(&body),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn insert(
        &self,
        collection: Collection,
        id: &str,
        document: &Document,
    ) -> Result<(), DbError> {
        let now = now();
        let res = sqlx::query(
            r#"
            insert into documents(collection, id, body, created_at, updated_at)
            values(?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(collection.path())
        .bind(id)
        .bind(serde_json::to_string(document)?)
        .bind(now)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(DbError::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn replace(
        &self,
        collection: Collection,
        id: &str,
        document: &Document,
    ) -> Result<(), DbError> {
        let res = sqlx::query(
            r#"
            update documents set body = ?3, updated_at = ?4
            where collection = ?1 and id = ?2
            "#,
        )
        .bind(collection.path())
        .bind(id)
        .bind(serde_json::to_string(document)?)
        .bind(now())
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, collection: Collection, id: &str) -> Result<(), DbError> {
        let res = sqlx::query("delete from documents where collection = ?1 and id = ?2")
            .bind(collection.path())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if res.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
