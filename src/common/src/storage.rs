use anyhow::Result;
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use std::sync::Arc;
use url::Url;

/// Create an object store for one bucket of the configured storage endpoint.
///
/// Supported DSNs:
/// - `s3://[access_key:secret_key@]host[:port]` (the bucket is supplied separately)
/// - `file:///root` (each bucket is an existing directory under `root`)
/// - `memory://` (a fresh in-memory store)
pub fn create_bucket_store(dsn: &str, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    if bucket.is_empty() {
        anyhow::bail!("Bucket name cannot be empty");
    }

    let url =
        Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

    match url.scheme() {
        "file" => {
            let path = url.path();
            if path.is_empty() || path == "/" {
                return Err(anyhow::anyhow!(
                    "File DSN must specify a path: file:///path/to/storage"
                ));
            }
            let root = std::path::Path::new(path).join(bucket);
            if !root.is_dir() {
                anyhow::bail!("Bucket directory {} does not exist", root.display());
            }
            Ok(Arc::new(LocalFileSystem::new_with_prefix(root)?))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        "s3" => {
            let builder = create_s3_builder_from_dsn(&url, bucket)?;
            Ok(Arc::new(builder.build()?))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory, s3",
            scheme
        )),
    }
}

/// Create an S3 builder for `bucket` from an endpoint DSN
/// DSN format: s3://[access_key:secret_key@]host[:port]
pub fn create_s3_builder_from_dsn(dsn: &Url, bucket: &str) -> Result<AmazonS3Builder> {
    let host = dsn
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Missing S3 host in DSN"))?;
    let port = dsn.port();

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region("us-east-1"); // Default region

    let access_key = dsn.username();
    let secret_key = dsn.password().unwrap_or("");

    if !access_key.is_empty() {
        builder = builder
            .with_access_key_id(access_key)
            .with_secret_access_key(secret_key);
    }

    // Real S3 needs no endpoint, anything else is S3-compatible (MinIO etc)
    let endpoint = if host.contains("amazonaws.com") {
        None
    } else {
        let scheme = if port == Some(443) { "https" } else { "http" };
        Some(match port {
            Some(p) => format!("{scheme}://{host}:{p}"),
            None => format!("{scheme}://{host}"),
        })
    };

    if let Some(endpoint) = endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(true)
            .with_virtual_hosted_style_request(false); // MinIO requires path-style URLs
    }

    if access_key.is_empty() {
        if let Ok(env_key) = std::env::var("AWS_ACCESS_KEY_ID") {
            builder = builder.with_access_key_id(env_key);
        }
        if let Ok(env_secret) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            builder = builder.with_secret_access_key(env_secret);
        }
        if let Ok(env_token) = std::env::var("AWS_SESSION_TOKEN") {
            builder = builder.with_token(env_token);
        }
    }
    if let Ok(env_region) = std::env::var("AWS_DEFAULT_REGION") {
        builder = builder.with_region(env_region);
    }

    Ok(builder)
}
