use thiserror::Error;

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read {what} from the catalog: {source}")]
    CatalogRead {
        what: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("dataset {dataset_id} has no bucket in its storage location '{location}'")]
    InvalidLocation { dataset_id: i64, location: String },

    #[error("dataset {dataset_id} has an unparseable routing criteria payload: {source}")]
    RoutingCriteria {
        dataset_id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl ReconcileError {
    pub(crate) fn catalog(what: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| ReconcileError::CatalogRead { what, source }
    }
}
