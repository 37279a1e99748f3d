//! Artifact retrieval and export.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use veo_models::{ApiKey, JobId};

use crate::client::ArtifactRef;
use crate::config::GenAiConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::veo::API_KEY_HEADER;

/// A retrieved artifact: a local preview plus the URI it can be re-fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedArtifact {
    pub preview_path: Option<PathBuf>,
    pub uri: String,
}

/// Result of exporting a video. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved { path: PathBuf },
    Failed { reason: String },
}

/// Retrieves generated videos and writes them to user folders.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Download the artifact for preview and return its durable reference.
    async fn materialize(
        &self,
        artifact: &ArtifactRef,
        credential: &ApiKey,
        job_id: &JobId,
    ) -> GenAiResult<MaterializedArtifact>;

    /// Save the video at `uri` as `folder/filename`.
    async fn export_to(&self, uri: &str, credential: &ApiKey, folder: &Path, filename: &str) -> ExportOutcome;
}

/// Streams artifacts over HTTP.
#[derive(Debug, Clone)]
pub struct HttpArtifactFetcher {
    client: Client,
    cache_dir: PathBuf,
}

impl HttpArtifactFetcher {
    /// Previews are cached under `cache_dir`.
    ///
    /// Downloads have no overall deadline; a transfer that stalls for longer
    /// than `download_idle_timeout` fails.
    pub fn new(config: &GenAiConfig, cache_dir: impl Into<PathBuf>) -> GenAiResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.download_idle_timeout)
            .build()?;
        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    /// Stream `uri` to `dest`, replacing it atomically. Returns bytes written.
    async fn download(&self, uri: &str, credential: &ApiKey, dest: &Path) -> GenAiResult<u64> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenAiError::from_status(status, error_text));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = dest.with_extension("part");
        let written = match write_through(response, &tmp, dest).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove {}: {}", tmp.display(), cleanup);
                    }
                }
                return Err(e);
            }
        };

        debug!("Downloaded {} bytes to {}", written, dest.display());
        Ok(written)
    }
}

/// Stream the body into `tmp`, then move it over `dest`.
async fn write_through(response: reqwest::Response, tmp: &Path, dest: &Path) -> GenAiResult<u64> {
    let mut file = tokio::fs::File::create(tmp).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(tmp, dest).await?;
    Ok(written)
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn materialize(
        &self,
        artifact: &ArtifactRef,
        credential: &ApiKey,
        job_id: &JobId,
    ) -> GenAiResult<MaterializedArtifact> {
        let preview = self.cache_dir.join(format!("{}.mp4", job_id));
        self.download(&artifact.uri, credential, &preview).await?;

        Ok(MaterializedArtifact {
            preview_path: Some(preview),
            uri: artifact.uri.clone(),
        })
    }

    async fn export_to(&self, uri: &str, credential: &ApiKey, folder: &Path, filename: &str) -> ExportOutcome {
        let path = folder.join(filename);
        info!("Downloading video to: {}", path.display());

        match self.download(uri, credential, &path).await {
            Ok(_) => ExportOutcome::Saved { path },
            Err(e) => {
                warn!("Export to {} failed: {}", path.display(), e);
                ExportOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
