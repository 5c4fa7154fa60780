use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;

use crate::error::ReleaseError;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_RETRY_DELAYS_SECS: [u64; 3] = [0, 2, 5];

/// Network access for the dependency fetcher.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Save the body of `url` to `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), ReleaseError>;
}

/// Streams downloads to disk over HTTPS, retrying transport errors and
/// non-success statuses.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ReleaseError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .user_agent(format!("mzero-release/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ReleaseError::network("<client>", error))?;
        Ok(Self { client })
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64, ReleaseError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| ReleaseError::network(url, error))?;

        if !response.status().is_success() {
            return Err(ReleaseError::network(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|error| ReleaseError::io("failed to create download file", dest, error))?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| ReleaseError::network(url, error))?;
            file.write_all(&chunk)
                .await
                .map_err(|error| ReleaseError::io("failed to write download data", dest, error))?;
            downloaded += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|error| ReleaseError::io("failed to flush download file", dest, error))?;

        Ok(downloaded)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), ReleaseError> {
        let mut last_error = None;

        for delay_secs in DOWNLOAD_RETRY_DELAYS_SECS {
            if delay_secs > 0 {
                debug!("Retrying {url} in {delay_secs}s");
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }

            match self.download_once(url, dest).await {
                Ok(bytes) => {
                    info!("Downloaded {url} ({bytes} bytes)");
                    return Ok(());
                }
                Err(error @ ReleaseError::Network { .. }) => {
                    warn!("{error}");
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| ReleaseError::network(url, "no attempts made")))
    }
}
