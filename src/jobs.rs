//! Consumer side of the training-job log stream.
//!
//! A job publishes plain log lines and structured progress messages on the
//! same channel. Progress messages are JSON objects tagged
//! `{"type": "progress", ...}`; everything else is a log line.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_LOG_BACKLOG;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether no further messages are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Stage a job reports in its progress messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    #[default]
    Pending,
    Preparing,
    Training,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Other,
}

/// Structured progress snapshot. Missing fields default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressEvent {
    pub epoch: u32,
    pub total_epochs: u32,
    pub batch: u32,
    pub total_batches: u32,
    /// Overall completion, 0..=100.
    pub pct: f32,
    pub elapsed_secs: f32,
    pub eta_secs: f32,
    pub phase: JobPhase,
}

impl ProgressEvent {
    /// Whether `self` reports less progress than `latest`.
    ///
    /// Only comparable within one phase: epoch first, then overall percent.
    /// Batch counters restart every epoch and epoch summaries carry batch 0,
    /// so the percent orders messages inside an epoch.
    pub fn is_older_than(&self, latest: &ProgressEvent) -> bool {
        if self.phase != latest.phase {
            return false;
        }
        self.epoch < latest.epoch || (self.epoch == latest.epoch && self.pct < latest.pct)
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Tagged {
    #[serde(rename = "progress")]
    Progress(ProgressEvent),
}

/// One message received on the job channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Progress(ProgressEvent),
    Line(String),
}

impl StreamMessage {
    /// Classify a raw payload. Anything that is not a well-formed progress
    /// object, including other JSON, is a log line.
    pub fn parse(raw: &str) -> Self {
        if raw.trim_start().starts_with('{') {
            match serde_json::from_str::<Tagged>(raw) {
                Ok(Tagged::Progress(event)) => return StreamMessage::Progress(event),
                Err(e) => log::trace!("Treating JSON payload as log line: {}", e),
            }
        }
        StreamMessage::Line(raw.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Persisted log history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub ts: String,
    pub line: String,
}

/// What [`JobLogFeed::push`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUpdate {
    LineAppended,
    /// Same text as the previous line; dropped.
    DuplicateLine,
    ProgressUpdated,
    /// Progress older than what is already shown; dropped.
    StaleProgress,
}

/// Accumulated view of one job's stream.
#[derive(Debug, Clone)]
pub struct JobLogFeed {
    lines: VecDeque<String>,
    backlog: usize,
    progress: Option<ProgressEvent>,
    status: JobStatus,
    reconnects: u32,
}

impl Default for JobLogFeed {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_BACKLOG)
    }
}

impl JobLogFeed {
    /// A feed that keeps at most `backlog` lines (at least one).
    pub fn new(backlog: usize) -> Self {
        let backlog = backlog.max(1);
        Self {
            lines: VecDeque::with_capacity(backlog.min(DEFAULT_LOG_BACKLOG)),
            backlog,
            progress: None,
            status: JobStatus::default(),
            reconnects: 0,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn progress(&self) -> Option<&ProgressEvent> {
        self.progress.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    pub fn push(&mut self, raw: &str) -> FeedUpdate {
        match StreamMessage::parse(raw) {
            StreamMessage::Progress(event) => self.push_progress(event),
            StreamMessage::Line(line) => self.push_line(line),
        }
    }

    fn push_line(&mut self, line: String) -> FeedUpdate {
        if self.lines.back() == Some(&line) {
            return FeedUpdate::DuplicateLine;
        }
        if self.lines.len() == self.backlog {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        FeedUpdate::LineAppended
    }

    fn push_progress(&mut self, event: ProgressEvent) -> FeedUpdate {
        if let Some(latest) = &self.progress
            && event.is_older_than(latest)
        {
            log::debug!(
                "Ignoring stale progress epoch {} ({:.1}%)",
                event.epoch,
                event.pct
            );
            return FeedUpdate::StaleProgress;
        }
        if self.status == JobStatus::Pending && event.phase != JobPhase::Pending {
            self.status = JobStatus::Running;
        }
        self.progress = Some(event);
        FeedUpdate::ProgressUpdated
    }

    /// Replace the backlog with persisted history, as when opening a job
    /// that is already running.
    pub fn load_history(&mut self, entries: &[LogEntry]) {
        self.lines.clear();
        for entry in entries {
            self.push_line(entry.line.clone());
        }
        log::debug!("Loaded {} job log line(s)", self.lines.len());
    }

    /// Record a dropped connection. Lines and progress are kept so a
    /// replayed tail is suppressed by the duplicate check.
    pub fn reconnected(&mut self) {
        self.reconnects += 1;
        log::info!("🔄 Job stream reconnected ({} so far)", self.reconnects);
    }

    pub fn set_status(&mut self, status: JobStatus) {
        if self.status != status {
            log::info!("Job status {:?} -> {:?}", self.status, status);
        }
        self.status = status;
    }
}
