//! Fetching remote attachments.
//!
//! A [`UrlFetcher`] retrieves a URL into a temporary file; [`download_file`]
//! then copies that file to its final location through the filesystem layer.
//! `file:` URLs are always supported. `http` and `https` need the `download`
//! feature.

use std::path::Path;

use async_trait::async_trait;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::ops::{FsError, copy_file};

/// Errors from fetching a URL.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("Request for {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Staging download failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Retrieves the contents of a URL into a temporary file.
///
/// The returned [`TempPath`] deletes the file when dropped.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<TempPath, DownloadError>;
}

/// Default fetcher: local copies for `file:` URLs, HTTP(S) via reqwest.
#[derive(Debug, Clone, Default)]
pub struct UrlDownloader {
    #[cfg(feature = "download")]
    client: reqwest::Client,
}

impl UrlDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_local(url: &Url) -> Result<TempPath, DownloadError> {
        let source = url.to_file_path().map_err(|()| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        let staged = tempfile::NamedTempFile::new()?.into_temp_path();
        copy_file(&source, &staged, true).await?;
        Ok(staged)
    }

    #[cfg(feature = "download")]
    async fn fetch_remote(&self, url: &Url) -> Result<TempPath, DownloadError> {
        let request_failed = |e: reqwest::Error| DownloadError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_failed)?;
        let body = response.bytes().await.map_err(request_failed)?;
        debug!(url = %url, bytes = body.len(), "Fetched remote body");

        let staged = tempfile::NamedTempFile::new()?.into_temp_path();
        tokio::fs::write(&staged, &body)
            .await
            .map_err(|e| FsError::from_io("write", staged.to_path_buf(), e))?;
        Ok(staged)
    }
}

#[async_trait]
impl UrlFetcher for UrlDownloader {
    async fn fetch(&self, url: &Url) -> Result<TempPath, DownloadError> {
        match url.scheme() {
            "file" => Self::fetch_local(url).await,
            #[cfg(feature = "download")]
            "http" | "https" => self.fetch_remote(url).await,
            other => Err(DownloadError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

/// Download `url` to `dest`.
///
/// Without `exist_ok`, an existing `dest` is an [`FsError::AlreadyExists`].
#[instrument(level = "debug", skip(fetcher, dest), fields(dest = %dest.as_ref().display()))]
pub async fn download_file(
    fetcher: &dyn UrlFetcher,
    url: &Url,
    dest: impl AsRef<Path>,
    exist_ok: bool,
) -> Result<(), DownloadError> {
    let staged = fetcher.fetch(url).await?;
    copy_file(&staged, dest.as_ref(), exist_ok).await?;
    Ok(())
}
