//! Testing utilities: an in-memory SQLite catalog with the production table
//! layout and helpers to seed it.
//!
//! Only available with the `testing` feature or in this crate's own tests.

use sqlx::query;
use sqlx::sqlite::SqlitePoolOptions;

use crate::catalog::Catalog;

const SQLITE_SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS datasets_new (
        id INTEGER PRIMARY KEY,
        raw_cloud_location TEXT NOT NULL,
        routing_criteria TEXT,
        deleted_at TEXT
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS dataset_raw_data_day_wise (
        id INTEGER PRIMARY KEY,
        dataset_id INTEGER NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        day INTEGER NOT NULL,
        deleted_at TEXT,
        UNIQUE (dataset_id, year, month, day)
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS dataset_raw_data_bucket_wise (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        dataset_raw_data_day_wise_id INTEGER NOT NULL,
        partitioned_bucket INTEGER NOT NULL,
        orc_files TEXT,
        UNIQUE (dataset_raw_data_day_wise_id, partitioned_bucket)
    )"#,
];

const INSERT_DATASET: &str = r#"
    INSERT INTO datasets_new (id, raw_cloud_location, routing_criteria)
    VALUES (?, ?, ?)
"#;

const INSERT_DAY_PARTITION: &str = r#"
    INSERT INTO dataset_raw_data_day_wise (id, dataset_id, year, month, day)
    VALUES (?, ?, ?, ?, ?)
"#;

const INSERT_TIME_BUCKET: &str = r#"
    INSERT INTO dataset_raw_data_bucket_wise
        (dataset_raw_data_day_wise_id, partitioned_bucket, orc_files)
    VALUES (?, ?, ?)
"#;

impl Catalog {
    /// Create an in-memory SQLite catalog with the catalog tables in place.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        // A single connection that never expires, otherwise every new
        // connection would see its own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        for statement in SQLITE_SCHEMA {
            query(statement).execute(&pool).await?;
        }

        Ok(Catalog::Sqlite(pool))
    }

    /// Insert a dataset row.
    pub async fn seed_dataset(
        &self,
        id: i64,
        raw_cloud_location: &str,
        routing_criteria: &str,
    ) -> Result<(), sqlx::Error> {
        let pool = self.sqlite_pool()?;
        query(INSERT_DATASET)
            .bind(id)
            .bind(raw_cloud_location)
            .bind(routing_criteria)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a dataset as soft-deleted.
    pub async fn soft_delete_dataset(&self, id: i64) -> Result<(), sqlx::Error> {
        let pool = self.sqlite_pool()?;
        query("UPDATE datasets_new SET deleted_at = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert a day partition row.
    pub async fn seed_day_partition(
        &self,
        id: i64,
        dataset_id: i64,
        year: i64,
        month: i64,
        day: i64,
    ) -> Result<(), sqlx::Error> {
        let pool = self.sqlite_pool()?;
        query(INSERT_DAY_PARTITION)
            .bind(id)
            .bind(dataset_id)
            .bind(year)
            .bind(month)
            .bind(day)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Insert a time bucket row with its file references.
    pub async fn seed_time_bucket(
        &self,
        day_partition_id: i64,
        partitioned_bucket: i64,
        orc_files: &[&str],
    ) -> Result<(), sqlx::Error> {
        let pool = self.sqlite_pool()?;
        let orc_files =
            serde_json::to_string(orc_files).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        query(INSERT_TIME_BUCKET)
            .bind(day_partition_id)
            .bind(partitioned_bucket)
            .bind(orc_files)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Store a raw, possibly malformed, file-list payload for a bucket.
    pub async fn seed_raw_time_bucket(
        &self,
        day_partition_id: i64,
        partitioned_bucket: i64,
        orc_files: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let pool = self.sqlite_pool()?;
        query(INSERT_TIME_BUCKET)
            .bind(day_partition_id)
            .bind(partitioned_bucket)
            .bind(orc_files)
            .execute(pool)
            .await?;
        Ok(())
    }

    fn sqlite_pool(&self) -> Result<&sqlx::SqlitePool, sqlx::Error> {
        match self {
            Catalog::Sqlite(pool) => Ok(pool),
            Catalog::Postgres(_) => Err(sqlx::Error::Configuration(
                "seeding helpers only support the SQLite catalog".into(),
            )),
        }
    }
}
