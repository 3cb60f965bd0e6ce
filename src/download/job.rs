//! Download job orchestration.
//!
//! A job is prepared synchronously by [`Downloader::start`]: options are
//! validated, the playlist is resolved and keys are fetched. Everything after
//! that runs on a background task:
//! - segments are scheduled onto a bounded pool of workers
//! - merged in playlist order once every worker has finished
//! - optionally converted to MP4

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::validation::validate_plan;
use crate::config::{validate_options, ConversionLevel};
use crate::download::client::{Fetch, HttpClient};
use crate::download::decrypt::decrypt_segment;
use crate::download::keys::resolve_keys;
use crate::download::merge::merge_files;
use crate::download::options::{DownloadOptions, PipelinePlan};
use crate::download::resolve::resolve_media_playlist;
use crate::download::retry::{fetch_with_retry, RetryPolicy};
use crate::download::status::{DownloadResult, DownloadStatus, Event, JobState, StageOutcome};
use crate::download::transcode::{Ffmpeg, Transcoder};
use crate::error::{Error, Result};
use crate::fs::{default_file_prefix, default_output_directory, ensure_dir, sanitize_filename, OutputLayout};
use crate::playlist::Segment;

/// Room in the event channel beyond one event per segment.
const EVENT_HEADROOM: usize = 10;

/// Builder for a download job.
///
/// The HTTP client and the transcoder default to the real implementations;
/// both can be replaced before [`start`](Self::start).
pub struct Downloader {
    options: DownloadOptions,
    plan: PipelinePlan,
    fetcher: Option<Arc<dyn Fetch>>,
    transcoder: Option<Arc<dyn Transcoder>>,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(options: DownloadOptions) -> Self {
        let plan = options.plan();
        let retry = RetryPolicy::from_network(&options.network);
        Self {
            options,
            plan,
            fetcher: None,
            transcoder: None,
            retry,
        }
    }

    /// Override the stages derived from the conversion level.
    pub fn with_plan(mut self, plan: PipelinePlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetch>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run the pre-flight steps and start downloading in the background.
    ///
    /// Any error returned here means no segment was scheduled.
    pub async fn start(self) -> Result<DownloadStatus> {
        validate_options(&self.options)?;
        validate_plan(self.plan)?;

        let transcoder = if self.plan.convert {
            match self.transcoder {
                Some(transcoder) => Some(transcoder),
                None => Some(Arc::new(Ffmpeg::locate().await?) as Arc<dyn Transcoder>),
            }
        } else {
            None
        };

        let fetcher: Arc<dyn Fetch> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpClient::new(
                &self.options.network,
                self.options.rate_limit(),
            )?),
        };

        let media = resolve_media_playlist(
            fetcher.as_ref(),
            &self.retry,
            &self.options.manifest_url,
            self.options.variant_selector.as_ref(),
        )
        .await?;

        let layout = output_layout(&self.options)?;
        ensure_dir(layout.directory()).await?;
        info!("Saving to {}", layout.directory().display());

        let mut segments = media.segments;
        let total = segments.len();
        let workers = self.options.workers();
        let (events_tx, events_rx) = mpsc::channel(total + EVENT_HEADROOM);

        let key_failures = resolve_keys(fetcher.as_ref(), &self.retry, &mut segments, workers).await;

        let state = Arc::new(JobState::new(segments));
        for &index in &key_failures {
            let segment = state.segments.lock().get(index).cloned();
            if let Some(segment) = segment {
                state.mark_completed();
                let _ = events_tx.send(Event::SegmentDone(segment)).await;
            }
        }

        let skipped: HashSet<usize> = key_failures.into_iter().collect();
        let pending: Vec<usize> = (0..total).filter(|i| !skipped.contains(i)).collect();
        let (done_tx, done_rx) = watch::channel(false);
        let status = DownloadStatus::new(Arc::clone(&state), total, events_rx, done_rx);

        let job = Job {
            state,
            fetcher,
            transcoder,
            retry: self.retry,
            layout,
            plan: self.plan,
            remove_intermediate_segments: self.options.remove_intermediate_segments,
            workers,
            events: events_tx,
        };
        tokio::spawn(job.run(pending, done_tx));

        Ok(status)
    }
}

/// Directory and prefix for a job, with timestamped defaults for blank values.
fn output_layout(options: &DownloadOptions) -> Result<OutputLayout> {
    let now = Local::now();

    let directory = if options.output_directory.to_string_lossy().trim().is_empty() {
        PathBuf::from(default_output_directory(now))
    } else {
        options.output_directory.clone()
    };

    let prefix = options.output_file_prefix.trim();
    let prefix = if prefix.is_empty() {
        default_file_prefix(now)
    } else {
        sanitize_filename(prefix)?
    };

    Ok(OutputLayout::new(directory, prefix))
}

/// The running part of a download, owned by its background task.
struct Job {
    state: Arc<JobState>,
    fetcher: Arc<dyn Fetch>,
    transcoder: Option<Arc<dyn Transcoder>>,
    retry: RetryPolicy,
    layout: OutputLayout,
    plan: PipelinePlan,
    remove_intermediate_segments: bool,
    workers: usize,
    events: mpsc::Sender<Event>,
}

impl Job {
    async fn run(self, pending: Vec<usize>, done: watch::Sender<bool>) {
        let job = Arc::new(self);

        job.download_segments(pending).await;
        job.merge_and_convert().await;

        info!("Download job finished");
        done.send_replace(true);
    }

    /// Schedule `pending` onto at most `workers` concurrent tasks and wait for
    /// all of them. Once the stop signal is raised nothing new is scheduled.
    async fn download_segments(self: &Arc<Self>, pending: Vec<usize>) {
        info!(
            "Downloading {} segment(s) with {} worker(s)",
            pending.len(),
            self.workers
        );

        let slots = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for index in pending {
            let permit = tokio::select! {
                biased;
                _ = self.state.stop.cancelled() => break,
                permit = Arc::clone(&slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            if self.state.stop.is_cancelled() {
                break;
            }

            let job = Arc::clone(self);
            tasks.spawn(async move {
                job.process_segment(index).await;
                drop(permit);
            });
        }

        if self.state.stop.is_cancelled() {
            info!("Stopped scheduling, waiting for {} running segment(s)", tasks.len());
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Segment task failed: {}", e);
            }
        }
    }

    /// Download, decrypt and save one segment, then report it.
    async fn process_segment(&self, index: usize) {
        let segment = self.state.segments.lock().get(index).cloned();
        let Some(mut segment) = segment else {
            return;
        };

        let path = self.layout.segment_path(index);
        if let Err(e) = self.fetch_segment(&segment, &path).await {
            warn!(index, url = %segment.url, error = %e, "Segment failed");
            let message = e.to_string();
            segment.fail(message.clone());
            if let Some(entry) = self.state.segments.lock().get_mut(index) {
                entry.fail(message);
            }
        }

        self.state.mark_completed();
        self.emit(Event::SegmentDone(segment)).await;
    }

    async fn fetch_segment(&self, segment: &Segment, path: &Path) -> Result<()> {
        let body = fetch_with_retry(self.fetcher.as_ref(), &segment.url, &self.retry).await?;

        let body = if segment.is_encrypted() {
            let meta = segment.encryption.clone();
            tokio::task::spawn_blocking(move || decrypt_segment(&body, &meta))
                .await
                .map_err(|e| Error::Encryption(format!("Decryption task failed: {}", e)))??
        } else {
            body
        };

        tokio::fs::write(path, &body)
            .await
            .map_err(|e| Error::filesystem(path, e))?;

        debug!(index = segment.index, bytes = body.len(), "Saved {}", path.display());
        Ok(())
    }

    async fn merge_and_convert(&self) {
        if self.state.stop.is_cancelled() {
            info!("Job was stopped, skipping merge and conversion");
            return;
        }
        if !self.plan.merge {
            return;
        }

        let sources: Vec<PathBuf> = self
            .state
            .segments
            .lock()
            .iter()
            .filter(|s| !s.is_failed())
            .map(|s| self.layout.segment_path(s.index))
            .collect();

        let merged = self.layout.merged_path();
        if let Err(e) = merge_files(&sources, &merged, self.remove_intermediate_segments).await {
            error!("Merge failed: {}", e);
            self.emit(Event::MergeDone(StageOutcome::Failed {
                path: merged,
                message: e.to_string(),
            }))
            .await;
            return;
        }
        self.emit(Event::MergeDone(StageOutcome::Succeeded {
            path: merged.clone(),
        }))
        .await;

        if self.state.stop.is_cancelled() {
            return;
        }
        let Some(transcoder) = &self.transcoder else {
            return;
        };

        let converted = self.layout.converted_path();
        let outcome = match transcoder.transcode(&merged, &converted).await {
            Ok(()) => {
                info!("Converted to {}", converted.display());
                StageOutcome::Succeeded { path: converted }
            }
            Err(e) => {
                error!("Conversion failed: {}", e);
                StageOutcome::Failed {
                    path: converted,
                    message: e.to_string(),
                }
            }
        };
        self.emit(Event::ConversionDone(outcome)).await;
    }

    async fn emit(&self, event: Event) {
        // The receiver is gone only if the caller dropped its status handle.
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }
}

/// Start a job with explicit options and return its live status.
pub async fn start_with_options(options: DownloadOptions) -> Result<DownloadStatus> {
    Downloader::new(options).start().await
}

/// Download `manifest_url` with default options and wait for the result.
pub async fn download(
    manifest_url: &str,
    conversion_level: ConversionLevel,
    output_directory: impl Into<PathBuf>,
    output_file_prefix: &str,
    worker_count: i64,
    show_progress: bool,
) -> Result<DownloadResult> {
    let mut options = DownloadOptions::new(
        manifest_url,
        output_directory,
        output_file_prefix,
        worker_count,
    );
    options.conversion_level = conversion_level;

    let status = start_with_options(options).await?;
    Ok(status.into_result(show_progress).await)
}
