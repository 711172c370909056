//! Catalog versus object storage reconciliation.
//!
//! Walks the catalog's dataset → day partition → time bucket hierarchy,
//! lists the matching object storage scope and reports, per time bucket,
//! whether both sides name the same set of files.

pub mod compare;
pub mod dedup;
pub mod enumerator;
pub mod error;
pub mod identifier;
pub mod listing;
pub mod partition;
pub mod report;
pub mod source;
pub mod traversal;

pub use enumerator::{ListingStatus, StorageEnumerator, StorageListing};
pub use error::ReconcileError;
pub use identifier::{Identifier, IdentifierError};
pub use listing::{ListingError, ListingPage, ObjectLister, ObjectStoreLister};
pub use partition::{InFlightPolicy, RoutingCriteria, StorageLocation};
pub use report::{ComparisonUnit, REPORT_COLUMNS, ReportWriter};
pub use source::CatalogSource;
pub use traversal::{Reconciler, RunSummary};
