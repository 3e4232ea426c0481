//! Object download.
//!
//! [`ObjectStore`] is the only way a handler reads an object. Two stores ship:
//!
//! - [`GcsStore`] — the storage JSON API (`?alt=media` download). The endpoint
//!   is configurable so the same code talks to a local emulator. A static
//!   bearer token can be attached; acquiring one is left to the deployment.
//! - [`LocalStore`] — `{root}/{bucket}/{key}` on the local filesystem, for
//!   dry runs and development without a bucket.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object location: {0}")]
    InvalidKey(String),
    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Reads object bytes from a bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
}

#[async_trait]
impl ObjectStore for Box<dyn ObjectStore> {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).fetch(bucket, key).await
    }
}

/// Downloads through the storage JSON API.
pub struct GcsStore {
    http_client: Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl GcsStore {
    pub fn new(
        endpoint: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| StorageError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint,
            access_token,
        })
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{key}?alt=media`, with `key`
    /// percent-encoded as a single path segment (`/` becomes `%2F`).
    fn media_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", key]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.media_url(bucket, key)?;
        let mut request = self.http_client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            status => {
                let text = response.text().await?;
                Err(StorageError::UnexpectedStatus { status, text })
            }
        }
    }
}

/// Serves objects from a directory tree: one subdirectory per bucket.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `{root}/{bucket}/{key}`, refusing anything that could escape `root`.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if bucket.is_empty() || escapes {
            return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    // =========================================================================
    // GcsStore
    // =========================================================================

    #[test]
    fn media_url_encodes_key_as_one_segment() {
        let store = GcsStore::new("https://storage.googleapis.com", None, TIMEOUT).unwrap();
        let url = store
            .media_url("photosub.appspot.com", "2014/misool/DSC 1378.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/photosub.appspot.com/o/2014%2Fmisool%2FDSC%201378.jpg?alt=media"
        );
    }

    #[test]
    fn media_url_keeps_endpoint_prefix() {
        let store = GcsStore::new("http://localhost:4443/emulator/", None, TIMEOUT).unwrap();
        let url = store.media_url("b", "k.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4443/emulator/storage/v1/b/b/o/k.jpg?alt=media"
        );
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(matches!(
            GcsStore::new("not a url", None, TIMEOUT),
            Err(StorageError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn gcs_fetch_downloads_media() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("/storage/v1/b/photos/o/")
                    .path_contains("DSC_1378.jpg")
                    .query_param("alt", "media")
                    .header("authorization", "Bearer t0ken");
                then.status(200).body([0xFF, 0xD8, 0xFF]);
            })
            .await;

        let store = GcsStore::new(&server.base_url(), Some("t0ken".into()), TIMEOUT).unwrap();
        let bytes = store.fetch("photos", "2014/DSC_1378.jpg").await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes, [0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn gcs_fetch_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(404).body("No such object");
            })
            .await;

        let store = GcsStore::new(&server.base_url(), None, TIMEOUT).unwrap();
        let result = store.fetch("photos", "missing.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn gcs_fetch_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(503).body("backend unavailable");
            })
            .await;

        let store = GcsStore::new(&server.base_url(), None, TIMEOUT).unwrap();
        match store.fetch("photos", "a.jpg").await {
            Err(StorageError::UnexpectedStatus { status, text }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(text, "backend unavailable");
            }
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    // =========================================================================
    // LocalStore
    // =========================================================================

    #[tokio::test]
    async fn local_fetch_reads_bucket_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("photos/2014/misool");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("DSC_1378.jpg"), b"jpeg bytes").unwrap();

        let store = LocalStore::new(tmp.path());
        let bytes = store.fetch("photos", "2014/misool/DSC_1378.jpg").await.unwrap();
        assert_eq!(bytes, b"jpeg bytes");
    }

    #[tokio::test]
    async fn local_fetch_missing_object() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let result = store.fetch("photos", "nope.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn local_fetch_refuses_traversal() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        for (bucket, key) in [("photos", "../secret.jpg"), ("..", "x.jpg"), ("", "x.jpg")] {
            let result = store.fetch(bucket, key).await;
            assert!(
                matches!(result, Err(StorageError::InvalidKey(_))),
                "{bucket}/{key}: {result:?}"
            );
        }
    }
}
