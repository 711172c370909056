//! Report assembly.
//!
//! One line per compared time bucket, preceded once per run by a header with
//! the run timestamp and the column names.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::partition::RoutingCriteria;

pub const REPORT_COLUMNS: &str = "Date, RoutingCriteria, DatasetId, TimeBucketInEpoch, \
    TimeBucketHumanReadable, S3RawOrcCount, DBRawOrcCount, NoOfDuplicatesinDB, S3vsDBSync, \
    S3ListingComplete, MalformedIdentifiers";

/// Outcome of reconciling one time bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonUnit {
    pub date: NaiveDate,
    pub routing: RoutingCriteria,
    pub dataset_id: i64,
    pub bucket_id: i64,
    /// Normalized identifiers found in storage
    pub storage_count: usize,
    /// Distinct normalized identifiers recorded by the catalog
    pub catalog_unique_count: usize,
    /// Repeated catalog identifiers beyond their first occurrence
    pub duplicate_count: usize,
    pub in_sync: bool,
    /// Every storage listing page was retrieved
    pub listing_complete: bool,
    /// Identifiers excluded from the comparison on either side
    pub malformed_count: usize,
}

impl ComparisonUnit {
    /// Render the unit as one report line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{}-{}-{}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}",
            self.date.day(),
            self.date.month(),
            self.date.year(),
            self.routing.label(),
            self.dataset_id,
            self.bucket_id,
            human_readable_bucket(self.bucket_id),
            self.storage_count,
            self.catalog_unique_count,
            self.duplicate_count,
            self.in_sync,
            self.listing_complete,
            self.malformed_count,
        )
    }
}

fn human_readable_bucket(bucket_id: i64) -> String {
    match DateTime::from_timestamp_millis(bucket_id) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => String::from("invalid-timestamp"),
    }
}

/// Append-only report sink for one run.
pub struct ReportWriter<W: Write> {
    sink: W,
    started_at: DateTime<Utc>,
    header_written: bool,
    lines_written: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Open (or create) `path` in append mode.
    pub fn open_append(path: &Path, started_at: DateTime<Utc>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file), started_at))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W, started_at: DateTime<Utc>) -> Self {
        Self {
            sink,
            started_at,
            header_written: false,
            lines_written: 0,
        }
    }

    /// Append one unit, writing the run header first if this is the first line.
    pub fn append(&mut self, unit: &ComparisonUnit) -> io::Result<()> {
        if !self.header_written {
            writeln!(self.sink)?;
            let started_at = self.started_at.to_rfc3339();
            writeln!(self.sink, "Time of this report: {started_at}")?;
            writeln!(self.sink, "{REPORT_COLUMNS}")?;
            self.header_written = true;
        }

        writeln!(self.sink, "{}", unit.to_line())?;
        self.sink.flush()?;
        self.lines_written += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn unit(bucket_id: i64, in_sync: bool) -> ComparisonUnit {
        ComparisonUnit {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            routing: RoutingCriteria {
                project: "proj".to_string(),
                app: "app".to_string(),
                plugin: "kafka".to_string(),
                document: "event".to_string(),
            },
            dataset_id: 42,
            bucket_id,
            storage_count: 3,
            catalog_unique_count: 2,
            duplicate_count: 1,
            in_sync,
            listing_complete: true,
            malformed_count: 0,
        }
    }

    fn started_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_709_600_000, 0).unwrap()
    }

    #[test]
    fn test_line_format() {
        let line = unit(1_709_596_800_000, false).to_line();
        let expected = concat!(
            "5-3-2024, proj/app/kafka/event, 42, 1709596800000, ",
            "2024-03-05 00:00:00 UTC, 3, 2, 1, false, true, 0"
        );
        assert_eq!(line, expected);
    }

    #[test]
    fn test_header_written_once() {
        let mut writer = ReportWriter::new(Vec::new(), started_at());
        writer.append(&unit(1_709_596_800_000, true)).unwrap();
        writer.append(&unit(1_709_600_400_000, false)).unwrap();
        writer.append(&unit(1_709_604_000_000, true)).unwrap();
        assert_eq!(writer.lines_written(), 3);

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output.matches("Time of this report:").count(), 1);
        assert_eq!(output.matches(REPORT_COLUMNS).count(), 1);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "Time of this report: 2024-03-05T00:53:20+00:00");
        assert_eq!(lines[2], REPORT_COLUMNS);
        assert_eq!(lines.len(), 6);
        assert!(lines[3].contains("1709596800000"));
        assert!(lines[5].contains("1709604000000"));
    }

    #[test]
    fn test_no_units_no_header() {
        let writer = ReportWriter::new(Vec::new(), started_at());
        assert_eq!(writer.lines_written(), 0);
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_each_run_appends_its_own_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        for _ in 0..2 {
            let mut writer = ReportWriter::open_append(&path, started_at()).unwrap();
            writer.append(&unit(1_709_596_800_000, true)).unwrap();
        }

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents.matches("Time of this report:").count(), 2);
        assert_eq!(contents.matches("proj/app/kafka/event").count(), 2);
    }

    #[test]
    fn test_invalid_bucket_timestamp_is_rendered() {
        let line = unit(i64::MAX, true).to_line();
        assert!(line.contains("invalid-timestamp"));
    }
}
