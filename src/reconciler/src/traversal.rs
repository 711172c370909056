//! Partition traversal: dataset → day → time bucket.
//!
//! For every dataset the engine visits yesterday's and today's day partition,
//! compares each comparable time bucket's catalog file list against the
//! objects found under the bucket's storage scope and appends one report line
//! per bucket. Catalog failures abort the run; storage listing failures only
//! mark the affected bucket as incompletely listed.

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use common::catalog::{DatasetRecord, TimeBucketRecord};

use crate::compare::same_members;
use crate::dedup::deduplicate;
use crate::enumerator::StorageEnumerator;
use crate::error::ReconcileError;
use crate::identifier::Identifier;
use crate::partition::{InFlightPolicy, RoutingCriteria, StorageLocation, bucket_scope, day_prefix};
use crate::report::{ComparisonUnit, ReportWriter};
use crate::source::CatalogSource;

/// Totals of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub datasets: usize,
    pub day_partitions: usize,
    pub buckets_compared: usize,
    pub buckets_in_flight: usize,
    pub buckets_in_sync: usize,
    pub buckets_drifted: usize,
    pub incomplete_listings: usize,
    pub duplicate_references: usize,
    pub malformed_identifiers: usize,
}

impl RunSummary {
    fn record(&mut self, unit: &ComparisonUnit) {
        self.buckets_compared += 1;
        if unit.in_sync {
            self.buckets_in_sync += 1;
        } else {
            self.buckets_drifted += 1;
        }
        if !unit.listing_complete {
            self.incomplete_listings += 1;
        }
        self.duplicate_references += unit.duplicate_count;
        self.malformed_identifiers += unit.malformed_count;
    }

    pub fn log(&self) {
        tracing::info!(
            datasets = self.datasets,
            day_partitions = self.day_partitions,
            buckets_compared = self.buckets_compared,
            buckets_in_flight = self.buckets_in_flight,
            buckets_in_sync = self.buckets_in_sync,
            buckets_drifted = self.buckets_drifted,
            incomplete_listings = self.incomplete_listings,
            duplicate_references = self.duplicate_references,
            malformed_identifiers = self.malformed_identifiers,
            "Reconciliation run finished"
        );
    }
}

/// Walks the catalog hierarchy and reconciles each time bucket with storage.
pub struct Reconciler {
    catalog: Arc<dyn CatalogSource>,
    enumerator: StorageEnumerator,
    policy: InFlightPolicy,
}

impl Reconciler {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        enumerator: StorageEnumerator,
        policy: InFlightPolicy,
    ) -> Self {
        Self {
            catalog,
            enumerator,
            policy,
        }
    }

    /// Reconcile yesterday's and today's partitions of every dataset.
    ///
    /// `today` decides which day is still open for writes. Lines already
    /// appended to `report` stay there when the run aborts.
    pub async fn run<W: Write>(
        &self,
        today: NaiveDate,
        report: &mut ReportWriter<W>,
    ) -> Result<RunSummary, ReconcileError> {
        let mut summary = RunSummary::default();
        let days: Vec<NaiveDate> = [today.pred_opt(), Some(today)]
            .into_iter()
            .flatten()
            .collect();

        let datasets = self
            .catalog
            .datasets()
            .await
            .map_err(ReconcileError::catalog("datasets"))?;

        tracing::info!(
            datasets = datasets.len(),
            today = %today,
            "Starting reconciliation run"
        );

        for dataset in &datasets {
            summary.datasets += 1;
            self.reconcile_dataset(dataset, today, &days, report, &mut summary)
                .await?;
        }

        Ok(summary)
    }

    async fn reconcile_dataset<W: Write>(
        &self,
        dataset: &DatasetRecord,
        today: NaiveDate,
        days: &[NaiveDate],
        report: &mut ReportWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<(), ReconcileError> {
        let location = StorageLocation::parse(&dataset.raw_cloud_location).ok_or_else(|| {
            ReconcileError::InvalidLocation {
                dataset_id: dataset.id,
                location: dataset.raw_cloud_location.clone(),
            }
        })?;
        let routing = RoutingCriteria::parse(&dataset.routing_criteria).map_err(|source| {
            ReconcileError::RoutingCriteria {
                dataset_id: dataset.id,
                source,
            }
        })?;

        tracing::debug!(
            dataset_id = dataset.id,
            bucket = %location.bucket,
            root_prefix = %location.root_prefix,
            routing = %routing.label(),
            "Reconciling dataset"
        );

        for &date in days {
            let Some(day) = self
                .catalog
                .day_partition(dataset.id, date)
                .await
                .map_err(ReconcileError::catalog("day partition"))?
            else {
                tracing::debug!(dataset_id = dataset.id, date = %date, "No day partition recorded");
                continue;
            };
            summary.day_partitions += 1;

            let buckets = self
                .catalog
                .time_buckets(day.id)
                .await
                .map_err(ReconcileError::catalog("time buckets"))?;

            let is_today = date == today;
            let mut remaining = self.policy.comparable_buckets(buckets.len(), is_today);

            tracing::debug!(
                dataset_id = dataset.id,
                day_partition_id = day.id,
                day_prefix = %day_prefix(date),
                buckets = buckets.len(),
                comparable = remaining,
                is_today,
                "Reconciling day partition"
            );

            for bucket in &buckets {
                if remaining > 0 {
                    let unit = self
                        .reconcile_bucket(dataset.id, date, &routing, &location, bucket)
                        .await;
                    tracing::info!(line = %unit.to_line(), "Compared time bucket");
                    report.append(&unit)?;
                    summary.record(&unit);
                } else {
                    tracing::debug!(
                        dataset_id = dataset.id,
                        bucket_id = bucket.partitioned_bucket,
                        "Skipping time bucket that may still receive writes"
                    );
                    summary.buckets_in_flight += 1;
                }
                remaining = remaining.saturating_sub(1);
            }
        }

        Ok(())
    }

    async fn reconcile_bucket(
        &self,
        dataset_id: i64,
        date: NaiveDate,
        routing: &RoutingCriteria,
        location: &StorageLocation,
        bucket: &TimeBucketRecord,
    ) -> ComparisonUnit {
        let scope = bucket_scope(location, date, bucket.partitioned_bucket);
        let listing = self.enumerator.enumerate(&location.bucket, &scope).await;

        let mut catalog_ids = Vec::with_capacity(bucket.orc_files.len());
        let mut catalog_malformed = 0;
        for reference in &bucket.orc_files {
            match Identifier::from_catalog_reference(reference) {
                Ok(id) => catalog_ids.push(id),
                Err(e) => {
                    tracing::warn!(
                        dataset_id,
                        bucket_id = bucket.partitioned_bucket,
                        reference = %reference,
                        error = %e,
                        "Excluding malformed catalog reference from comparison"
                    );
                    catalog_malformed += 1;
                }
            }
        }

        let catalog = deduplicate(catalog_ids);
        if catalog.duplicate_count() > 0 {
            let duplicates: Vec<&str> = catalog.duplicates.iter().map(Identifier::as_str).collect();
            tracing::info!(
                dataset_id,
                bucket_id = bucket.partitioned_bucket,
                duplicates = ?duplicates,
                "Catalog lists duplicate file references"
            );
        }

        let in_sync = same_members(&listing.identifiers, &catalog.unique);
        if !in_sync {
            tracing::warn!(
                dataset_id,
                bucket_id = bucket.partitioned_bucket,
                scope = %scope,
                storage = listing.identifiers.len(),
                catalog = catalog.unique.len(),
                "Catalog and storage disagree"
            );
        }

        ComparisonUnit {
            date,
            routing: routing.clone(),
            dataset_id,
            bucket_id: bucket.partitioned_bucket,
            storage_count: listing.identifiers.len(),
            catalog_unique_count: catalog.unique.len(),
            duplicate_count: catalog.duplicate_count(),
            in_sync,
            listing_complete: listing.status.is_complete(),
            malformed_count: listing.malformed.len() + catalog_malformed,
        }
    }
}
