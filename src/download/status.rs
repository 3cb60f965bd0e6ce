//! Live job status and the aggregated final result.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::output::progress::create_segment_bar;
use crate::playlist::Segment;

/// Outcome of the merge or conversion stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StageOutcome {
    Succeeded { path: PathBuf },
    Failed { path: PathBuf, message: String },
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Succeeded { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            StageOutcome::Succeeded { path } | StageOutcome::Failed { path, .. } => path,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            StageOutcome::Succeeded { .. } => None,
            StageOutcome::Failed { message, .. } => Some(message),
        }
    }
}

/// Progress notifications emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A segment reached its final state. Sent exactly once per segment that
    /// was attempted or failed during key resolution.
    SegmentDone(Segment),
    MergeDone(StageOutcome),
    ConversionDone(StageOutcome),
}

/// Everything a finished job produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// Reported segments, ordered by index.
    pub segments: Vec<Segment>,
    pub merge: Option<StageOutcome>,
    pub conversion: Option<StageOutcome>,
    /// The stop signal was raised before every segment was scheduled.
    pub cancelled: bool,
    /// Indexes of segments that were never scheduled.
    pub unattempted: Vec<usize>,
}

impl DownloadResult {
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::SegmentDone(segment) => self.segments.push(segment),
            Event::MergeDone(outcome) => self.merge = Some(outcome),
            Event::ConversionDone(outcome) => self.conversion = Some(outcome),
        }
    }

    pub fn failed_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_failed())
    }

    pub fn succeeded_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_failed()).count()
    }

    /// Path of the most processed output, if that stage succeeded.
    pub fn final_output(&self) -> Option<&Path> {
        match (&self.conversion, &self.merge) {
            (Some(conversion), _) if conversion.is_success() => Some(conversion.path()),
            (None, Some(merge)) if merge.is_success() => Some(merge.path()),
            _ => None,
        }
    }

    /// No segment, stage or cancellation left anything undone.
    pub fn is_complete_success(&self) -> bool {
        !self.cancelled
            && self.unattempted.is_empty()
            && self.failed_segments().next().is_none()
            && self.merge.as_ref().map_or(true, StageOutcome::is_success)
            && self.conversion.as_ref().map_or(true, StageOutcome::is_success)
    }
}

/// State shared between the running job and its status handle.
pub(crate) struct JobState {
    pub(crate) segments: Mutex<Vec<Segment>>,
    pub(crate) completed: AtomicUsize,
    pub(crate) stop: CancellationToken,
}

impl JobState {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments: Mutex::new(segments),
            completed: AtomicUsize::new(0),
            stop: CancellationToken::new(),
        }
    }

    pub(crate) fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle on a running download job.
pub struct DownloadStatus {
    state: Arc<JobState>,
    total: usize,
    events: tokio::sync::Mutex<mpsc::Receiver<Event>>,
    done: watch::Receiver<bool>,
}

impl fmt::Debug for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadStatus")
            .field("total", &self.total)
            .field("completed", &self.completed())
            .field("stopped", &self.is_stopped())
            .field("done", &self.is_done())
            .finish()
    }
}

impl DownloadStatus {
    pub(crate) fn new(
        state: Arc<JobState>,
        total: usize,
        events: mpsc::Receiver<Event>,
        done: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            total,
            events: tokio::sync::Mutex::new(events),
            done,
        }
    }

    /// Number of segments in the playlist.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Segments that reached a final state, successful or not.
    pub fn completed(&self) -> usize {
        self.state.completed.load(Ordering::SeqCst)
    }

    /// Whether the job has finished, merge and conversion included.
    pub fn is_done(&self) -> bool {
        *self.done.borrow()
    }

    /// A completion receiver; each clone observes the signal independently.
    pub fn done(&self) -> watch::Receiver<bool> {
        self.done.clone()
    }

    /// Block until the job has finished.
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        // An error means the job task is gone, which only happens after it signalled.
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Next event, or `None` once every event has been received.
    pub async fn next_event(&self) -> Option<Event> {
        self.events.lock().await.recv().await
    }

    /// Snapshot of every segment with its current error state.
    pub fn segments(&self) -> Vec<Segment> {
        self.state.segments.lock().clone()
    }

    /// Stop scheduling new segments. Calling it again has no further effect.
    pub fn shutdown(&self) {
        if !self.state.stop.is_cancelled() {
            tracing::info!("Shutdown requested, no new segments will be scheduled");
        }
        self.state.stop.cancel();
    }

    /// The job's stop signal, for callers that cancel from another task.
    pub fn stop_token(&self) -> CancellationToken {
        self.state.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stop.is_cancelled()
    }

    /// Drain events until the job finishes and fold them into a result.
    pub async fn into_result(self, show_progress: bool) -> DownloadResult {
        let bar = show_progress.then(|| create_segment_bar(self.total as u64));
        let mut result = DownloadResult::default();
        let mut events = self.events.into_inner();
        let mut done = self.done.clone();

        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => {
                        if let (Some(bar), Event::SegmentDone(_)) = (&bar, &event) {
                            bar.set_position(self.state.completed.load(Ordering::SeqCst) as u64);
                        }
                        result.apply(event);
                    }
                    None => break,
                },
                _ = done.wait_for(|finished| *finished) => break,
            }
        }

        while let Ok(event) = events.try_recv() {
            result.apply(event);
        }

        if let Some(bar) = bar {
            bar.set_position(self.state.completed.load(Ordering::SeqCst) as u64);
            bar.finish_and_clear();
        }

        result.segments.sort_by_key(|s| s.index);
        result.cancelled = self.state.stop.is_cancelled();

        let reported: std::collections::HashSet<usize> =
            result.segments.iter().map(|s| s.index).collect();
        result.unattempted = (0..self.total).filter(|i| !reported.contains(i)).collect();

        result
    }
}
