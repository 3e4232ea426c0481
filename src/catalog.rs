//! Catalog API client.
//!
//! The catalog exposes a single resource:
//!
//! | Request | Body | Effect |
//! |---|---|---|
//! | `POST {base}/image` | [`ImageItem`] | insert or replace the image entry |
//! | `DELETE {base}/image` | [`DeleteRequest`] | remove the entry |
//!
//! [`HttpCatalog::with_endpoint`] takes the `/image` URL directly instead.
//!
//! Any 2xx status is success. Requests are sent once; a failure is returned to
//! the handler, which logs it and stops.

use crate::types::{DeleteRequest, ImageItem};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {text}")]
    UnexpectedStatus { status: StatusCode, text: String },
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
}

/// The remote image catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn insert(&self, item: &ImageItem) -> Result<(), CatalogError>;
    async fn delete(&self, request: &DeleteRequest) -> Result<(), CatalogError>;
}

pub struct HttpCatalog {
    http_client: Client,
    image_url: Url,
}

impl HttpCatalog {
    /// Client for the catalog rooted at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let image_url = format!("{}/image", base_url.trim_end_matches('/'));
        let image_url = Url::parse(&image_url)
            .map_err(|e| CatalogError::InvalidUrl(format!("{base_url}: {e}")))?;
        Self::with_endpoint(image_url, timeout)
    }

    /// Client that sends every request to `image_url` unchanged.
    pub fn with_endpoint(image_url: Url, timeout: Duration) -> Result<Self, CatalogError> {
        let http_client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http_client,
            image_url,
        })
    }

    pub fn image_url(&self) -> &Url {
        &self.image_url
    }

    async fn send<T: Serialize + Sync>(
        &self,
        method: reqwest::Method,
        body: &T,
    ) -> Result<(), CatalogError> {
        let response = self
            .http_client
            .request(method, self.image_url.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await?;
        Err(CatalogError::UnexpectedStatus { status, text })
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn insert(&self, item: &ImageItem) -> Result<(), CatalogError> {
        self.send(reqwest::Method::POST, item).await
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<(), CatalogError> {
        self.send(reqwest::Method::DELETE, request).await
    }
}
