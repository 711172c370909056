use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use common::catalog::{Catalog, DatasetRecord, DayPartitionRecord, TimeBucketRecord};

/// Read access to the catalog hierarchy walked by the reconciler.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All live datasets, ordered by id.
    async fn datasets(&self) -> Result<Vec<DatasetRecord>, sqlx::Error>;

    /// The day partition of a dataset for `date`, if the catalog recorded one.
    async fn day_partition(
        &self,
        dataset_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DayPartitionRecord>, sqlx::Error>;

    /// Time buckets of a day partition, ascending by bucket id.
    async fn time_buckets(
        &self,
        day_partition_id: i64,
    ) -> Result<Vec<TimeBucketRecord>, sqlx::Error>;
}

#[async_trait]
impl CatalogSource for Catalog {
    async fn datasets(&self) -> Result<Vec<DatasetRecord>, sqlx::Error> {
        self.list_datasets().await
    }

    async fn day_partition(
        &self,
        dataset_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DayPartitionRecord>, sqlx::Error> {
        self.find_day_partition(
            dataset_id,
            i64::from(date.year()),
            i64::from(date.month()),
            i64::from(date.day()),
        )
        .await
    }

    async fn time_buckets(
        &self,
        day_partition_id: i64,
    ) -> Result<Vec<TimeBucketRecord>, sqlx::Error> {
        self.list_time_buckets(day_partition_id).await
    }
}
