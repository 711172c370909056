use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, Row, SqlitePool, query};

use crate::config::DatabaseConfig;

/// A dataset row from `datasets_new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRecord {
    pub id: i64,
    /// Raw storage location, e.g. `s3a://bucket/raw/project/app`
    pub raw_cloud_location: String,
    /// Routing criteria JSON payload as stored
    pub routing_criteria: String,
}

/// A day partition row from `dataset_raw_data_day_wise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPartitionRecord {
    pub id: i64,
    pub year: i64,
    pub month: i64,
    pub day: i64,
}

/// A time bucket row from `dataset_raw_data_bucket_wise`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucketRecord {
    /// Epoch-millisecond lower boundary of the bucket
    pub partitioned_bucket: i64,
    /// File references recorded by the catalog, duplicates included
    pub orc_files: Vec<String>,
}

/// Read-only client for the metadata catalog (PostgreSQL or SQLite).
#[derive(Clone)]
pub enum Catalog {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Catalog {
    /// Connect to the catalog described by `config`.
    ///
    /// PostgreSQL sessions are opened with `default_transaction_read_only`
    /// so a reconciliation run can never write to the catalog.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let dsn = config.dsn.as_str();
        log::info!("Connecting to catalog database");

        let catalog = if dsn.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(dsn)?.read_only(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await
                .map_err(|e| {
                    log::error!("Failed to connect to SQLite catalog: {e}");
                    e
                })?;
            Catalog::Sqlite(pool)
        } else {
            let options = PgConnectOptions::from_str(dsn)?;
            let options = options.options([("default_transaction_read_only", "on")]);
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await
                .map_err(|e| {
                    log::error!("Failed to connect to PostgreSQL catalog: {e}");
                    e
                })?;
            Catalog::Postgres(pool)
        };

        log::info!("Catalog connection established successfully");
        Ok(catalog)
    }

    /// All datasets that are not soft-deleted, ordered by id.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetRecord>, sqlx::Error> {
        let rows = match self {
            Catalog::Postgres(pool) => {
                query(
                    r#"
                    SELECT id, raw_cloud_location, routing_criteria::text AS routing_criteria
                    FROM datasets_new
                    WHERE deleted_at IS NULL
                    ORDER BY id
                    "#,
                )
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|row| {
                    Ok(DatasetRecord {
                        id: row.try_get("id")?,
                        raw_cloud_location: row.try_get("raw_cloud_location")?,
                        routing_criteria: row
                            .try_get::<Option<String>, _>("routing_criteria")?
                            .unwrap_or_default(),
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?
            }
            Catalog::Sqlite(pool) => {
                query(
                    r#"
                    SELECT id, raw_cloud_location, routing_criteria
                    FROM datasets_new
                    WHERE deleted_at IS NULL
                    ORDER BY id
                    "#,
                )
                .fetch_all(pool)
                .await?
                .into_iter()
                .map(|row| {
                    Ok(DatasetRecord {
                        id: row.try_get("id")?,
                        raw_cloud_location: row.try_get("raw_cloud_location")?,
                        routing_criteria: row
                            .try_get::<Option<String>, _>("routing_criteria")?
                            .unwrap_or_default(),
                    })
                })
                .collect::<Result<Vec<_>, sqlx::Error>>()?
            }
        };

        log::debug!("Loaded {} datasets from catalog", rows.len());
        Ok(rows)
    }

    /// The day partition of `dataset_id` for the given calendar day, if recorded.
    pub async fn find_day_partition(
        &self,
        dataset_id: i64,
        year: i64,
        month: i64,
        day: i64,
    ) -> Result<Option<DayPartitionRecord>, sqlx::Error> {
        let row = match self {
            Catalog::Postgres(pool) => {
                query(
                    r#"
                    SELECT id, year, month, day
                    FROM dataset_raw_data_day_wise
                    WHERE deleted_at IS NULL
                      AND dataset_id = $1 AND year = $2 AND month = $3 AND day = $4
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(dataset_id)
                .bind(year)
                .bind(month)
                .bind(day)
                .fetch_optional(pool)
                .await?
                .map(|row| day_partition_from_pg(&row))
                .transpose()?
            }
            Catalog::Sqlite(pool) => {
                query(
                    r#"
                    SELECT id, year, month, day
                    FROM dataset_raw_data_day_wise
                    WHERE deleted_at IS NULL
                      AND dataset_id = ? AND year = ? AND month = ? AND day = ?
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(dataset_id)
                .bind(year)
                .bind(month)
                .bind(day)
                .fetch_optional(pool)
                .await?
                .map(|row| {
                    Ok::<_, sqlx::Error>(DayPartitionRecord {
                        id: row.try_get("id")?,
                        year: row.try_get("year")?,
                        month: row.try_get("month")?,
                        day: row.try_get("day")?,
                    })
                })
                .transpose()?
            }
        };

        Ok(row)
    }

    /// Time buckets of a day partition ordered by ascending bucket id.
    pub async fn list_time_buckets(
        &self,
        day_partition_id: i64,
    ) -> Result<Vec<TimeBucketRecord>, sqlx::Error> {
        match self {
            Catalog::Postgres(pool) => query(
                r#"
                SELECT partitioned_bucket, orc_files
                FROM dataset_raw_data_bucket_wise
                WHERE dataset_raw_data_day_wise_id = $1
                ORDER BY partitioned_bucket
                "#,
            )
            .bind(day_partition_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| {
                Ok(TimeBucketRecord {
                    partitioned_bucket: row.try_get("partitioned_bucket")?,
                    orc_files: row
                        .try_get::<Option<Vec<String>>, _>("orc_files")?
                        .unwrap_or_default(),
                })
            })
            .collect(),
            // SQLite has no array type, file lists are stored as JSON text
            Catalog::Sqlite(pool) => query(
                r#"
                SELECT partitioned_bucket, orc_files
                FROM dataset_raw_data_bucket_wise
                WHERE dataset_raw_data_day_wise_id = ?
                ORDER BY partitioned_bucket
                "#,
            )
            .bind(day_partition_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| {
                let orc_files = match row.try_get::<Option<String>, _>("orc_files")? {
                    Some(json) => serde_json::from_str::<Vec<String>>(&json)
                        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
                    None => Vec::new(),
                };
                Ok(TimeBucketRecord {
                    partitioned_bucket: row.try_get("partitioned_bucket")?,
                    orc_files,
                })
            })
            .collect(),
        }
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        match self {
            Catalog::Postgres(pool) => pool.close().await,
            Catalog::Sqlite(pool) => pool.close().await,
        }
    }
}

fn day_partition_from_pg(row: &sqlx::postgres::PgRow) -> Result<DayPartitionRecord, sqlx::Error> {
    Ok(DayPartitionRecord {
        id: row.try_get("id")?,
        year: row.try_get("year")?,
        month: row.try_get("month")?,
        day: row.try_get("day")?,
    })
}
