//! Paginated object listing.
//!
//! [`ObjectLister`] is the seam between the enumerator and object storage: one
//! call returns one page of keys plus the token needed for the next page.
//! [`ObjectStoreLister`] serves pages from an `object_store` backend.

use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use thiserror::Error;

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Object keys, relative to the bucket root
    pub keys: Vec<String>,
    /// More keys exist beyond this page
    pub is_truncated: bool,
    /// Token to pass to the next `list_page` call when truncated
    pub continuation_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("object store request failed: {0}")]
    Store(#[from] object_store::Error),

    #[error("invalid continuation token: {0}")]
    InvalidToken(#[from] object_store::path::Error),

    #[error("cannot open bucket '{bucket}': {message}")]
    Bucket { bucket: String, message: String },
}

/// Source of paginated object listings.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// List one page of keys under `prefix` in `bucket`, resuming after
    /// `continuation` when given.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListingPage, ListingError>;
}

enum StoreSource {
    /// Build one store per bucket from the storage DSN
    Dsn(String),
    /// Serve every bucket from the same store
    Fixed(Arc<dyn ObjectStore>),
}

/// [`ObjectLister`] backed by the `object_store` crate.
///
/// Pages hold the `page_size` lexicographically smallest keys after the
/// continuation token, and the token is the last key of the page. Backends
/// that list out of order (the local filesystem walks directories) still
/// page correctly because each page is selected from the whole remainder of
/// the scope.
pub struct ObjectStoreLister {
    source: StoreSource,
    page_size: usize,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreLister {
    /// Lister that opens each bucket on the endpoint described by `dsn`.
    pub fn from_dsn(dsn: impl Into<String>, page_size: usize) -> Self {
        Self {
            source: StoreSource::Dsn(dsn.into()),
            page_size: page_size.max(1),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Lister that serves all buckets from `store`.
    pub fn from_store(store: Arc<dyn ObjectStore>, page_size: usize) -> Self {
        Self {
            source: StoreSource::Fixed(store),
            page_size: page_size.max(1),
            stores: Mutex::new(HashMap::new()),
        }
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, ListingError> {
        let dsn = match &self.source {
            StoreSource::Fixed(store) => return Ok(Arc::clone(store)),
            StoreSource::Dsn(dsn) => dsn,
        };

        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store = common::storage::create_bucket_store(dsn, bucket).map_err(|e| {
            ListingError::Bucket {
                bucket: bucket.to_string(),
                message: format!("{e:#}"),
            }
        })?;
        tracing::debug!(bucket = %bucket, "Opened object store for bucket");
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl ObjectLister for ObjectStoreLister {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListingPage, ListingError> {
        let store = self.store_for(bucket)?;
        let prefix = ObjectPath::from(prefix);

        let mut stream = match continuation {
            Some(token) => {
                let offset = ObjectPath::parse(token)?;
                store.list_with_offset(Some(&prefix), &offset)
            }
            None => store.list(Some(&prefix)),
        };

        // max-heap holding the page_size + 1 smallest keys seen so far
        let mut smallest = BinaryHeap::with_capacity(self.page_size + 1);
        while let Some(meta) = stream.next().await {
            smallest.push(meta?.location.to_string());
            if smallest.len() > self.page_size + 1 {
                smallest.pop();
            }
        }

        let mut keys = smallest.into_sorted_vec();
        let is_truncated = keys.len() > self.page_size;
        keys.truncate(self.page_size);

        let continuation_token = if is_truncated {
            keys.last().cloned()
        } else {
            None
        };

        tracing::trace!(
            bucket = %bucket,
            prefix = %prefix,
            keys = keys.len(),
            is_truncated,
            "Listed page"
        );

        Ok(ListingPage {
            keys,
            is_truncated,
            continuation_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::PutPayload;
    use object_store::memory::InMemory;

    async fn store_with(keys: &[&str]) -> Arc<dyn ObjectStore> {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(&ObjectPath::from(*key), PutPayload::from_static(b"orc"))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_pages_through_prefix() {
        let keys: Vec<String> = (0..5)
            .map(|i| format!("raw/time-bucket=1/w+p{i}+f{i}.orc"))
            .collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let store = store_with(&key_refs).await;
        let lister = ObjectStoreLister::from_store(store, 2);

        let first = lister
            .list_page("bucket", "raw/time-bucket=1/", None)
            .await
            .unwrap();
        assert_eq!(first.keys, vec![keys[0].clone(), keys[1].clone()]);
        assert!(first.is_truncated);
        assert_eq!(first.continuation_token.as_deref(), Some(keys[1].as_str()));

        let token = first.continuation_token.as_deref();
        let second = lister
            .list_page("bucket", "raw/time-bucket=1/", token)
            .await
            .unwrap();
        assert_eq!(second.keys, vec![keys[2].clone(), keys[3].clone()]);
        assert!(second.is_truncated);

        let token = second.continuation_token.as_deref();
        let third = lister
            .list_page("bucket", "raw/time-bucket=1/", token)
            .await
            .unwrap();
        assert_eq!(third.keys, vec![keys[4].clone()]);
        assert!(!third.is_truncated);
        assert_eq!(third.continuation_token, None);
    }

    #[tokio::test]
    async fn test_filesystem_listing_pages_in_key_order() {
        let root = tempfile::tempdir().unwrap();
        let scope = root.path().join("raw-bucket/raw/time-bucket=1");
        std::fs::create_dir_all(&scope).unwrap();

        let mut expected: Vec<String> = (0..40)
            .map(|i| format!("w{}+p{i}+f{}.orc", (i * 7) % 13, (i * 31) % 97))
            .collect();
        for name in &expected {
            std::fs::write(scope.join(name), b"orc").unwrap();
        }
        expected = expected
            .into_iter()
            .map(|name| format!("raw/time-bucket=1/{name}"))
            .collect();
        expected.sort();

        let dsn = format!("file://{}", root.path().display());
        let lister = ObjectStoreLister::from_dsn(dsn, 3);

        let mut listed = Vec::new();
        let mut pages = 0;
        let mut continuation: Option<String> = None;
        loop {
            let token = continuation.as_deref();
            let page = lister
                .list_page("raw-bucket", "raw/time-bucket=1/", token)
                .await
                .unwrap();
            pages += 1;
            assert!(page.keys.len() <= 3);
            listed.extend(page.keys);
            if !page.is_truncated {
                break;
            }
            continuation = page.continuation_token;
        }

        assert_eq!(pages, 14);
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_is_not_truncated() {
        let store = store_with(&["raw/a+b+c.orc", "raw/d+e+f.orc"]).await;
        let lister = ObjectStoreLister::from_store(store, 2);

        let page = lister.list_page("bucket", "raw/", None).await.unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_prefix_is_segment_scoped() {
        let store = store_with(&[
            "raw/time-bucket=1/w+p1+f1.orc",
            "raw/time-bucket=10/w+p2+f2.orc",
        ])
        .await;
        let lister = ObjectStoreLister::from_store(store, 100);

        let page = lister
            .list_page("bucket", "raw/time-bucket=1/", None)
            .await
            .unwrap();
        assert_eq!(page.keys, ["raw/time-bucket=1/w+p1+f1.orc"]);
    }

    #[tokio::test]
    async fn test_empty_prefix_yields_empty_page() {
        let store = store_with(&[]).await;
        let lister = ObjectStoreLister::from_store(store, 10);

        let page = lister
            .list_page("bucket", "nothing/here/", None)
            .await
            .unwrap();
        assert_eq!(page, ListingPage::default());
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_a_bucket_error() {
        let lister = ObjectStoreLister::from_dsn("ftp://example.com", 10);
        let err = lister.list_page("bucket", "raw/", None).await.unwrap_err();
        assert!(matches!(err, ListingError::Bucket { .. }));
    }

    #[tokio::test]
    async fn test_missing_filesystem_bucket_is_a_bucket_error() {
        let root = tempfile::tempdir().unwrap();
        let dsn = format!("file://{}", root.path().display());
        let lister = ObjectStoreLister::from_dsn(dsn, 10);

        let err = lister
            .list_page("raw-bucket", "raw/", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::Bucket { .. }));
        assert!(!root.path().join("raw-bucket").exists());
    }
}
