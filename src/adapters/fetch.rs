use crate::domain::error::AcquisitionError;
use crate::ports::fetch::SourceFetcher;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tracing::info;

/// Size of the write buffer between the response stream and the file.
const WRITE_CHUNK: usize = 8 * 1024;
/// Progress is logged each time this many more bytes have arrived.
const PROGRESS_STEP: u64 = 10 * 1024 * 1024;

/// Streams a remote file over HTTP(S) with reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: Client,
    /// Bound on connecting and on the wait for each body chunk
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl SourceFetcher for ReqwestFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, AcquisitionError> {
        let response = timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| timed_out(url))?
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length().unwrap_or(0);
        info!(%url, size_mb = total as f64 / (1024.0 * 1024.0), "download started");

        let file = File::create(dest).await.map_err(|source| AcquisitionError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::with_capacity(WRITE_CHUNK, file);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut next_report = PROGRESS_STEP;

        loop {
            let chunk = match timeout(self.timeout, stream.next()).await {
                Err(_) => return Err(timed_out(url)),
                Ok(None) => break,
                Ok(Some(chunk)) => chunk.map_err(|e| transport_error(url, e))?,
            };
            writer
                .write_all(&chunk)
                .await
                .map_err(|source| AcquisitionError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
            downloaded += chunk.len() as u64;

            if downloaded >= next_report {
                let progress = if total > 0 {
                    downloaded as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                info!(
                    percent = (progress * 10.0).round() / 10.0,
                    downloaded_mb = downloaded / (1024 * 1024),
                    "download progress"
                );
                while next_report <= downloaded {
                    next_report += PROGRESS_STEP;
                }
            }
        }

        writer.flush().await.map_err(|source| AcquisitionError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(downloaded)
    }
}

fn timed_out(url: &str) -> AcquisitionError {
    AcquisitionError::Timeout {
        url: url.to_string(),
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> AcquisitionError {
    if err.is_timeout() {
        return timed_out(url);
    }
    AcquisitionError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}
