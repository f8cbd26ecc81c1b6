//! Concurrent download orchestration.
//!
//! Each file in a dispatch round gets its own task streaming the response
//! body straight to its staged path. Results come back over an unbounded
//! channel as typed [`JobResult`]s, one per job, in completion order; the
//! channel closes when the round is drained. A failed or cancelled job
//! deletes its partial file so the staging area never holds torn content.
//!
//! The instructions document is fetched separately through
//! [`Orchestrator::fetch_manifest`], which accumulates the body in memory
//! and rejects any transfer that ends before the required trailer line.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::constants::USER_AGENT;
use crate::core::{QupError, Result};
use crate::install::mark_executable;
use crate::manifest::Manifest;


/// One file to fetch: where from, where to, and whether the staged copy
/// must carry the executable bit.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Remote file name, used in logs and error reports.
    pub file_name: String,
    /// Fully resolved download URL.
    pub url: String,
    /// Staged path the body is written to.
    pub target: PathBuf,
    /// Whether to mark the staged copy executable on success.
    pub executable: bool,
}

/// Per-job completion report.
#[derive(Debug)]
pub struct JobResult {
    pub file_name: String,
    /// Bytes written on success; the transfer or cancellation error otherwise.
    pub outcome: Result<u64>,
}

impl JobResult {
    pub fn is_cancelled(&self) -> bool {
        matches!(&self.outcome, Err(e) if e.is_cancelled())
    }
}

/// Dispatches download rounds over a shared HTTP client.
pub struct Orchestrator {
    client: reqwest::Client,
}

impl Orchestrator {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| QupError::validation(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Spawns one task per job and returns the result channel.
    ///
    /// The receiver yields exactly one [`JobResult`] per job and closes once
    /// every task has reported. Cancelling the token aborts in-flight
    /// transfers; each aborted job still reports, with a cancellation error.
    pub fn dispatch(
        &self,
        jobs: Vec<DownloadJob>,
        cancel: &CancellationToken,
    ) -> mpsc::UnboundedReceiver<JobResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        for job in jobs {
            let client = self.client.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                tracing::debug!(file = %job.file_name, url = %job.url, "fetching");
                let file_name = job.file_name.clone();
                let outcome = fetch_one(&client, &job, &cancel).await;
                // The session may have stopped listening after an interrupt.
                let _ = tx.send(JobResult { file_name, outcome });
            });
        }
        rx
    }

    /// Fetches the instructions document, verifies its trailer, and writes
    /// it to `target`.
    ///
    /// The body accumulates in memory; a transfer that ends without the
    /// end-of-file trailer means a truncated document and is rejected as a
    /// manifest error, never parsed.
    pub async fn fetch_manifest(
        &self,
        url: &str,
        target: &Path,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(QupError::Cancelled),
            response = self.client.get(url).send() => response,
        }
        .and_then(|r| r.error_for_status())
        .map_err(|e| QupError::Manifest { location: url.to_string(), reason: e.to_string() })?;

        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(QupError::Cancelled),
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    return Err(QupError::Manifest {
                        location: url.to_string(),
                        reason: e.to_string(),
                    });
                }
                None => break,
            }
        }

        if !Manifest::is_complete(&buffer) {
            return Err(QupError::Manifest {
                location: url.to_string(),
                reason: "transfer ended before the end-of-file trailer".to_string(),
            });
        }

        fs::write(target, &buffer)
            .await
            .map_err(|_| QupError::filesystem("write manifest", target.display().to_string()))?;

        String::from_utf8(buffer).map_err(|_| QupError::Manifest {
            location: url.to_string(),
            reason: "document is not valid UTF-8".to_string(),
        })
    }
}

/// Streams one response body to its staged path.
///
/// The target is truncated on open and appended chunk by chunk. Any failure
/// or cancellation mid-stream discards the partial file before reporting.
async fn fetch_one(
    client: &reqwest::Client,
    job: &DownloadJob,
    cancel: &CancellationToken,
) -> Result<u64> {
    if cancel.is_cancelled() {
        return Err(QupError::Cancelled);
    }

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(QupError::Cancelled),
        response = client.get(&job.url).send() => response,
    }
    .and_then(|r| r.error_for_status())
    .map_err(|e| QupError::Transfer { file: job.file_name.clone(), reason: e.to_string() })?;

    if let Some(parent) = job.target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|_| QupError::filesystem("create directory", parent.display().to_string()))?;
    }

    let mut file = fs::File::create(&job.target)
        .await
        .map_err(|_| QupError::filesystem("create", job.target.display().to_string()))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                drop(file);
                discard_partial(&job.target).await;
                return Err(QupError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };
        let Some(chunk) = chunk else { break };

        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                discard_partial(&job.target).await;
                return Err(QupError::Transfer {
                    file: job.file_name.clone(),
                    reason: e.to_string(),
                });
            }
        };
        if let Err(e) = file.write_all(&bytes).await {
            drop(file);
            discard_partial(&job.target).await;
            return Err(QupError::Transfer {
                file: job.file_name.clone(),
                reason: e.to_string(),
            });
        }
        written += bytes.len() as u64;
    }

    file.flush()
        .await
        .map_err(|_| QupError::filesystem("flush", job.target.display().to_string()))?;
    drop(file);

    if job.executable {
        mark_executable(&job.target)?;
    }

    tracing::debug!(file = %job.file_name, bytes = written, "fetched");
    Ok(written)
}

/// Removes a partially written staged file; failure to remove is ignored,
/// the next round truncates it anyway.
async fn discard_partial(target: &Path) {
    let _ = fs::remove_file(target).await;
}
