//! Partition layout: where a dataset, day and time bucket live in storage,
//! and which buckets of a day can be compared.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

/// Bucket and root prefix of a dataset's raw data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    /// Key prefix below the bucket, always ending in `/` unless empty
    pub root_prefix: String,
}

impl StorageLocation {
    /// Parse a location such as `s3a://bucket/raw/project/app`.
    ///
    /// Returns `None` when no bucket segment can be found.
    pub fn parse(raw: &str) -> Option<Self> {
        let without_scheme = match raw.split_once("://") {
            Some((_, rest)) => rest,
            None => raw,
        };
        let trimmed = without_scheme.trim_matches('/');
        let (bucket, rest) = match trimmed.split_once('/') {
            Some((bucket, rest)) => (bucket, rest.trim_matches('/')),
            None => (trimmed, ""),
        };

        if bucket.is_empty() {
            return None;
        }

        let root_prefix = if rest.is_empty() {
            String::new()
        } else {
            format!("{rest}/")
        };

        Some(Self {
            bucket: bucket.to_string(),
            root_prefix,
        })
    }
}

/// Routing labels of a dataset, stored as a JSON payload in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoutingCriteria {
    #[serde(rename = "_tag_projectName", default)]
    pub project: String,
    #[serde(rename = "_tag_appName", default)]
    pub app: String,
    #[serde(rename = "_plugin", default)]
    pub plugin: String,
    #[serde(rename = "_documentType", default)]
    pub document: String,
}

impl RoutingCriteria {
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// `project/app/plugin/document`
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.project, self.app, self.plugin, self.document
        )
    }
}

/// `year=Y/month=M/day=D/`, without zero padding.
pub fn day_prefix(date: NaiveDate) -> String {
    format!(
        "year={}/month={}/day={}/",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Full key prefix of one time bucket.
pub fn bucket_scope(location: &StorageLocation, date: NaiveDate, bucket_id: i64) -> String {
    format!(
        "{}{}time-bucket={}/",
        location.root_prefix,
        day_prefix(date),
        bucket_id
    )
}

/// Excludes the trailing buckets of the current day, which may still be
/// receiving writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightPolicy {
    in_flight_buckets: usize,
}

impl Default for InFlightPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

impl InFlightPolicy {
    pub fn new(in_flight_buckets: usize) -> Self {
        Self { in_flight_buckets }
    }

    /// Number of leading buckets of a day that may be compared.
    pub fn comparable_buckets(&self, total: usize, is_today: bool) -> usize {
        if is_today {
            total.saturating_sub(self.in_flight_buckets)
        } else {
            total
        }
    }
}
