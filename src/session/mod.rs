//! Session state machine: one product's update lifecycle.
//!
//! A [`Session`] owns the parameters of one product (name, manifest
//! location, destination, platform) and drives the pipeline through its
//! states:
//!
//! ```text
//! Idle -> FetchingManifest -> Parsing -> Downloading -> ReadyToSync
//!                                                          |
//!                                          Installing <----+
//!                                              |
//!                                            Idle
//! ```
//!
//! Any stage can divert to `Cancelled` (interrupt observed) or `Error`.
//! Progress is reported as a stream of [`SessionEvent`]s over an unbounded
//! channel; the CLI renders them, other front ends could too.
//!
//! Concurrency model: the session is a cheaply cloneable handle around a
//! shared inner. Exactly one long-running operation may hold the session at
//! a time; a second request while one is running is rejected synchronously
//! with a conflict error naming the active operation, never queued and
//! never silently dropped. Interruption is cooperative: the current
//! cancellation token is cancelled, the active operation unwinds at its
//! next check, and a fresh token is installed so the session remains
//! usable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::constants::{SETTLE_DELAY, STAGING_PREFIX, WRITABLE_POLL_INTERVAL};
use crate::core::{QupError, Result};
use crate::digest::{self, DiffReport};
use crate::download::{DownloadJob, Orchestrator};
use crate::install::Installer;
use crate::launch::Launcher;
use crate::manifest::Manifest;
use crate::platform::Platform;


/// Parameters of one update session, validated before any I/O.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Product name; also names the staging directory and the executable.
    pub product: String,
    /// Manifest location: an `http(s)://` URL or a local file path.
    pub manifest_url: String,
    /// Install destination directory.
    pub destination: PathBuf,
    /// Target platform the manifest is interpreted for.
    pub platform: Platform,
}

impl SessionParams {
    fn validate(&self) -> Result<()> {
        if self.product.trim().is_empty() {
            return Err(QupError::validation("product name must not be empty"));
        }
        if self.manifest_url.trim().is_empty() {
            return Err(QupError::validation("manifest location must not be empty"));
        }
        if self.is_remote() && reqwest::Url::parse(&self.manifest_url).is_err() {
            return Err(QupError::validation(format!(
                "'{}' is not a valid URL",
                self.manifest_url
            )));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(QupError::validation("destination directory must not be empty"));
        }
        Ok(())
    }

    fn is_remote(&self) -> bool {
        self.manifest_url.starts_with("http://") || self.manifest_url.starts_with("https://")
    }
}

/// Lifecycle states of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FetchingManifest,
    Parsing,
    Downloading,
    ReadyToSync,
    Installing,
    Cancelled,
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::FetchingManifest => "fetching manifest",
            Self::Parsing => "parsing",
            Self::Downloading => "downloading",
            Self::ReadyToSync => "ready to sync",
            Self::Installing => "installing",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Progress reported by a session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A human-readable log line with its local timestamp.
    Log { timestamp: DateTime<Local>, line: String },
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A diff pass found changes since the previous pass.
    FilesDiffered(DiffReport),
    /// The destination directory's writability changed.
    DestinationWritable(bool),
}

struct Inner {
    params: SessionParams,
    staging: PathBuf,
    orchestrator: Orchestrator,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: Mutex<SessionState>,
    /// Aggregate digest of the previous diff pass; suppresses unchanged
    /// re-reports.
    last_aggregate: Mutex<Option<String>>,
    /// Exactly one long-running operation at a time.
    busy: AtomicBool,
    active_op: Mutex<String>,
    /// Replaced with a fresh token after every interrupt.
    cancel: Mutex<CancellationToken>,
}

impl Inner {
    fn emit(&self, event: SessionEvent) {
        // The receiver may be gone; events are best-effort.
        let _ = self.events.send(event);
    }

    fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(product = %self.params.product, "{line}");
        self.emit(SessionEvent::Log { timestamp: Local::now(), line });
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
        self.emit(SessionEvent::StateChanged(state));
    }

    fn token(&self) -> CancellationToken {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Cloneable handle on one product's update session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

/// Releases the busy flag when the holding operation finishes.
struct BusyGuard {
    inner: Arc<Inner>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.active_op.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.inner.busy.store(false, Ordering::Release);
    }
}

impl Session {
    /// Creates a session and its event stream.
    ///
    /// Parameters are validated here, before any I/O: a rejected session
    /// never touches the network or the file system.
    pub fn new(params: SessionParams) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        params.validate()?;
        let staging =
            std::env::temp_dir().join(format!("{STAGING_PREFIX}{}", params.product));
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            params,
            staging,
            orchestrator: Orchestrator::new()?,
            events,
            state: Mutex::new(SessionState::Idle),
            last_aggregate: Mutex::new(None),
            busy: AtomicBool::new(false),
            active_op: Mutex::new(String::new()),
            cancel: Mutex::new(CancellationToken::new()),
        });
        Ok((Self { inner }, receiver))
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a long-running operation currently holds the session.
    pub fn is_active(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// The per-product staging directory.
    pub fn staging_dir(&self) -> &PathBuf {
        &self.inner.staging
    }

    /// Runs one full download round: fetch the manifest, parse it, download
    /// every file into staging, then report the staged/installed diff.
    ///
    /// Rejected with a conflict error if another operation is running.
    pub async fn start(&self) -> Result<()> {
        let guard = self.acquire("download")?;
        let outcome = self.run_download_round().await;
        drop(guard);
        self.conclude("Download round", outcome)
    }

    /// Copies the staged tree into the destination, then re-reports the
    /// diff so the caller sees the trees converge.
    pub async fn install(&self) -> Result<()> {
        let guard = self.acquire("install")?;
        let outcome = self.run_install().await;
        drop(guard);
        self.conclude("Install", outcome)
    }

    /// Recomputes the staged/installed diff without downloading anything.
    pub async fn refresh(&self) -> Result<()> {
        let guard = self.acquire("refresh")?;
        let outcome = self.run_diff().await;
        drop(guard);
        outcome
    }

    /// Launches the installed product, detached. Allowed while idle only.
    pub fn launch(&self) -> Result<()> {
        if self.is_active() {
            let active = self
                .inner
                .active_op
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            return Err(QupError::Conflict { requested: "launch".to_string(), active });
        }
        Launcher::new(&self.inner.params.product, self.inner.params.platform)
            .launch(&self.inner.params.destination)
    }

    /// Cancels the running operation, waits for it to unwind, and installs
    /// a fresh cancellation token. A no-op when nothing is running.
    pub async fn interrupt(&self) {
        if !self.is_active() {
            return;
        }
        self.inner.token().cancel();
        while self.is_active() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        *self.inner.cancel.lock().unwrap_or_else(|e| e.into_inner()) = CancellationToken::new();
    }

    /// Spawns a background loop running a full download round every
    /// `interval`, optionally followed by an install. Rounds that would
    /// conflict with a foreground operation are skipped, not queued. Abort
    /// the handle to stop the loop.
    pub fn spawn_periodic_refresh(
        &self,
        interval: Duration,
        install_after: bool,
    ) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            timer.tick().await;
            loop {
                timer.tick().await;
                let outcome = match session.start().await {
                    Ok(()) if install_after => session.install().await,
                    other => other,
                };
                match outcome {
                    Ok(()) => {}
                    Err(QupError::Conflict { .. }) => {
                        tracing::debug!("periodic round skipped, session is busy");
                    }
                    Err(e) => tracing::warn!("periodic round failed: {e}"),
                }
            }
        })
    }

    /// Spawns a background poll of the destination directory's writability,
    /// emitting an event whenever the answer changes. Abort the handle to
    /// stop the poll.
    pub fn spawn_writability_poll(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut last: Option<bool> = None;
            let mut timer = tokio::time::interval(WRITABLE_POLL_INTERVAL);
            loop {
                timer.tick().await;
                let writable = destination_writable(&inner.params.destination);
                if last != Some(writable) {
                    last = Some(writable);
                    inner.emit(SessionEvent::DestinationWritable(writable));
                }
            }
        })
    }

    fn acquire(&self, op: &str) -> Result<BusyGuard> {
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let active = self
                .inner
                .active_op
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            return Err(QupError::Conflict { requested: op.to_string(), active });
        }
        *self.inner.active_op.lock().unwrap_or_else(|e| e.into_inner()) = op.to_string();
        Ok(BusyGuard { inner: self.inner.clone() })
    }

    /// Maps an operation outcome onto the terminal state and log line.
    fn conclude(&self, what: &str, outcome: Result<()>) -> Result<()> {
        match &outcome {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                self.inner.set_state(SessionState::Cancelled);
                self.inner.log(format!("{what} interrupted."));
                // A cancelled session is immediately usable again.
                self.inner.set_state(SessionState::Idle);
            }
            Err(e) => {
                self.inner.set_state(SessionState::Error);
                self.inner.log(format!("Failed: {e}."));
            }
        }
        outcome
    }

    async fn run_download_round(&self) -> Result<()> {
        let inner = &self.inner;
        let cancel = inner.token();

        inner.set_state(SessionState::FetchingManifest);
        inner.log(format!(
            "Starting: fetching instructions from {}.",
            inner.params.manifest_url
        ));

        tokio::fs::create_dir_all(&inner.staging).await.map_err(|_| {
            QupError::filesystem("create staging directory", inner.staging.display().to_string())
        })?;

        let text = self.fetch_manifest_text(&cancel).await?;
        inner.log("Succeeded: instructions fetched.");

        inner.set_state(SessionState::Parsing);
        let manifest = Manifest::parse(&text, inner.params.platform);
        inner.log(format!(
            "Parsed {} file entries in {} batches.",
            manifest.file_count(),
            manifest.batches.len()
        ));

        inner.set_state(SessionState::Downloading);
        let jobs = self.plan_jobs(&manifest);
        let total = jobs.len();
        inner.log(format!("Starting: downloading {total} files."));

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut results = inner.orchestrator.dispatch(jobs, &cancel);
        while let Some(result) = results.recv().await {
            match result.outcome {
                Ok(bytes) => {
                    succeeded += 1;
                    inner.log(format!("Downloaded {} ({bytes} bytes).", result.file_name));
                }
                Err(e) if e.is_cancelled() => return Err(QupError::Cancelled),
                Err(e) => {
                    failed += 1;
                    inner.log(format!("Failed: {e}."));
                }
            }
        }

        // Let a burst of completions settle into one decision.
        tokio::time::sleep(SETTLE_DELAY).await;
        if cancel.is_cancelled() {
            return Err(QupError::Cancelled);
        }

        // One decision for the whole round: any failed job blocks install,
        // whatever did stage stays in the staging area for the next attempt.
        if failed > 0 {
            return Err(QupError::Transfer {
                file: inner.params.product.clone(),
                reason: format!("{failed} of {total} downloads failed"),
            });
        }

        inner.set_state(SessionState::ReadyToSync);
        inner.log(format!("Succeeded: {succeeded} of {total} files staged."));

        self.run_diff().await
    }

    /// Fetches the manifest from its URL, or reads it from a local path.
    /// Either way the document must carry its end-of-file trailer.
    async fn fetch_manifest_text(&self, cancel: &CancellationToken) -> Result<String> {
        let inner = &self.inner;
        if inner.params.is_remote() {
            let target = inner.staging.join("instructions.txt");
            return inner
                .orchestrator
                .fetch_manifest(&inner.params.manifest_url, &target, cancel)
                .await;
        }

        let path = PathBuf::from(&inner.params.manifest_url);
        let bytes = tokio::fs::read(&path).await.map_err(|e| QupError::Manifest {
            location: path.display().to_string(),
            reason: format!("cannot open for processing: {e}"),
        })?;
        if !Manifest::is_complete(&bytes) {
            return Err(QupError::Manifest {
                location: path.display().to_string(),
                reason: "document ends before the end-of-file trailer".to_string(),
            });
        }
        String::from_utf8(bytes).map_err(|_| QupError::Manifest {
            location: path.display().to_string(),
            reason: "document is not valid UTF-8".to_string(),
        })
    }

    /// Expands a parsed manifest into concrete download jobs.
    fn plan_jobs(&self, manifest: &Manifest) -> Vec<DownloadJob> {
        let mut jobs = Vec::with_capacity(manifest.file_count());
        for batch in &manifest.batches {
            let base = batch.base_url.trim_end_matches('/');
            for spec in &batch.files {
                jobs.push(DownloadJob {
                    file_name: spec.name.clone(),
                    url: format!("{base}/{}", spec.name),
                    target: self.inner.staging.join(spec.relative_path()),
                    executable: spec.executable,
                });
            }
        }
        jobs
    }

    async fn run_install(&self) -> Result<()> {
        let inner = &self.inner;
        inner.set_state(SessionState::Installing);
        inner.log(format!(
            "Starting: installing into {}.",
            inner.params.destination.display()
        ));

        let installer = Installer::new(&inner.params.product, inner.params.platform);
        let staging = inner.staging.clone();
        let destination = inner.params.destination.clone();
        let cancel = inner.token();
        let log_target = Arc::clone(inner);
        let report = tokio::task::spawn_blocking(move || {
            installer.sync(&staging, &destination, &cancel, |line| log_target.log(line))
        })
        .await
        .map_err(|e| QupError::validation(format!("install task failed: {e}")))??;

        if report.cancelled {
            return Err(QupError::Cancelled);
        }
        if report.failed.is_empty() {
            inner.log(format!("Succeeded: {} files installed.", report.copied));
        } else {
            inner.log(format!(
                "Completed with problems: {} files installed, {} failed.",
                report.copied,
                report.failed.len()
            ));
        }

        self.run_diff().await?;
        inner.set_state(SessionState::Idle);
        Ok(())
    }

    /// Runs a diff pass on a blocking task and publishes the report, unless
    /// the aggregate digest says nothing changed since the last pass.
    async fn run_diff(&self) -> Result<()> {
        let inner = &self.inner;
        let staging = inner.staging.clone();
        let destination = inner.params.destination.clone();
        let cancel = inner.token();
        let previous =
            inner.last_aggregate.lock().unwrap_or_else(|e| e.into_inner()).clone();

        let report = tokio::task::spawn_blocking(move || {
            digest::compare(&staging, &destination, previous.as_deref(), &cancel)
        })
        .await
        .map_err(|e| QupError::validation(format!("diff task failed: {e}")))??;

        if let Some(report) = report {
            *inner.last_aggregate.lock().unwrap_or_else(|e| e.into_inner()) =
                Some(report.aggregate.clone());
            let changed = report.records.iter().filter(|r| r.differs()).count();
            inner.log(format!(
                "Compared {} files; {changed} differ.",
                report.records.len()
            ));
            inner.emit(SessionEvent::FilesDiffered(report));
        }
        Ok(())
    }
}

/// Best-effort writability probe of the destination directory.
fn destination_writable(path: &std::path::Path) -> bool {
    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
        Err(_) => false,
    }
}
