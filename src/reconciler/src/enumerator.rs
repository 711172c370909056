use std::sync::Arc;

use crate::identifier::Identifier;
use crate::listing::ObjectLister;

/// Whether every listing page under a scope was retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingStatus {
    Complete,
    /// Enumeration stopped early; keys of earlier pages are kept
    Incomplete { reason: String },
}

impl ListingStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ListingStatus::Complete)
    }
}

/// Normalized contents of one storage scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageListing {
    /// Identifiers of objects carrying the object extension
    pub identifiers: Vec<Identifier>,
    /// Keys with the object extension that could not be normalized
    pub malformed: Vec<String>,
    /// Pages retrieved successfully
    pub pages: usize,
    pub status: ListingStatus,
}

/// Lists every object under a scope prefix and normalizes the relevant ones.
pub struct StorageEnumerator {
    lister: Arc<dyn ObjectLister>,
    extension: String,
}

impl StorageEnumerator {
    pub fn new(lister: Arc<dyn ObjectLister>, extension: impl Into<String>) -> Self {
        Self {
            lister,
            extension: extension.into(),
        }
    }

    /// Page through `prefix` in `bucket` until the listing is exhausted.
    ///
    /// A failed page is logged and ends the enumeration: it contributes no
    /// keys and the returned status is [`ListingStatus::Incomplete`].
    pub async fn enumerate(&self, bucket: &str, prefix: &str) -> StorageListing {
        let mut identifiers = Vec::new();
        let mut malformed = Vec::new();
        let mut pages = 0;
        let mut continuation: Option<String> = None;

        let status = loop {
            let page = match self
                .lister
                .list_page(bucket, prefix, continuation.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        bucket = %bucket,
                        prefix = %prefix,
                        pages_listed = pages,
                        error = %e,
                        "Unable to list objects, treating the rest of the scope as empty"
                    );
                    break ListingStatus::Incomplete {
                        reason: e.to_string(),
                    };
                }
            };
            pages += 1;

            for key in page.keys {
                if !key.ends_with(&self.extension) {
                    continue;
                }
                match Identifier::from_storage_key(&key, &self.extension) {
                    Ok(id) => identifiers.push(id),
                    Err(e) => {
                        tracing::warn!(
                            bucket = %bucket,
                            key = %key,
                            error = %e,
                            "Excluding malformed storage key from comparison"
                        );
                        malformed.push(key);
                    }
                }
            }

            if !page.is_truncated {
                break ListingStatus::Complete;
            }
            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => {
                    tracing::error!(
                        bucket = %bucket,
                        prefix = %prefix,
                        pages_listed = pages,
                        "Truncated listing page carried no continuation token"
                    );
                    break ListingStatus::Incomplete {
                        reason: "truncated page without continuation token".to_string(),
                    };
                }
            }
        };

        tracing::debug!(
            bucket = %bucket,
            prefix = %prefix,
            objects = identifiers.len(),
            malformed = malformed.len(),
            pages,
            complete = status.is_complete(),
            "Enumerated storage scope"
        );

        StorageListing {
            identifiers,
            malformed,
            pages,
            status,
        }
    }
}
