//! Task tree executor.
//!
//! Runs planned trees against the destination folder:
//! - text payloads (NFO) are written in one shot
//! - stream payloads (media, subtitles, artwork) are streamed from the catalog
//!
//! Every write goes through a part file and is renamed into place only once
//! complete. Roots run through a bounded, ordered pool; a failing leaf never
//! stops the others.

use crate::core::progress::{NoProgress, ProgressSink, Throttled};
use crate::models::task::{FetchKind, FetchTask, Payload, SkipSet, StreamRequest};
use crate::services::catalog::Catalog;
use crate::utils::format::human_size;
use crate::utils::fs::LocalSink;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Root trees processed at the same time.
    pub concurrency: usize,
    /// Streams larger than this get a live transfer view.
    pub progress_threshold: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_threshold: 1024 * 1024,
        }
    }
}

/// Result of one leaf.
#[derive(Debug)]
pub enum TaskStatus {
    Written { bytes: u64, elapsed: Duration },
    Skipped,
    Failed(Error),
    Cancelled,
}

/// Outcome of one leaf destination.
#[derive(Debug)]
pub struct TaskOutcome {
    pub path: String,
    pub kind: FetchKind,
    pub status: TaskStatus,
}

impl TaskOutcome {
    fn new(path: String, kind: FetchKind, status: TaskStatus) -> Self {
        Self { path, kind, status }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed(_))
    }
}

/// Summary of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub roots_total: usize,
    /// Roots that ran to the end without cancellation.
    pub roots_completed: usize,
    /// Leaf outcomes in execution order.
    pub outcomes: Vec<TaskOutcome>,
}

impl RunSummary {
    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TaskStatus::Written { bytes, .. } => bytes,
                _ => 0,
            })
            .sum()
    }

    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Skipped))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Cancelled))
    }

    pub fn failures(&self) -> Vec<&TaskOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed()).collect()
    }

    /// No failures and nothing cancelled.
    pub fn is_success(&self) -> bool {
        self.failures().is_empty() && self.cancelled() == 0
    }

    fn count(&self, f: impl Fn(&TaskStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| f(&o.status)).count()
    }
}

/// Task tree executor.
pub struct Executor {
    catalog: Arc<dyn Catalog>,
    sink: LocalSink,
    config: ExecutorConfig,
    progress: Arc<dyn ProgressSink>,
}

impl Executor {
    pub fn new(catalog: Arc<dyn Catalog>, sink: LocalSink) -> Self {
        Self::with_config(catalog, sink, ExecutorConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn Catalog>, sink: LocalSink, config: ExecutorConfig) -> Self {
        Self {
            catalog,
            sink,
            config,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Execute every tree, consuming them.
    ///
    /// Roots start in submission order. Cancellation is checked before each
    /// root and each leaf, and aborts an ongoing transfer.
    pub async fn run(
        &self,
        trees: Vec<FetchTask>,
        skip: &SkipSet,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let started_at = Utc::now();
        let clock = Instant::now();
        let roots_total = trees.len();
        let total: u64 = trees.iter().map(|t| t.total_size(skip)).sum();

        tracing::info!(
            "Executing {} root(s), {} to download, {} at a time",
            roots_total,
            human_size(total),
            self.config.concurrency.max(1)
        );
        self.progress.run_started(roots_total, total);

        let results: Vec<(bool, Vec<TaskOutcome>)> = stream::iter(trees)
            .map(|tree| self.run_root(tree, skip, cancel))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let roots_completed = results.iter().filter(|(done, _)| *done).count();
        let outcomes = results.into_iter().flat_map(|(_, o)| o).collect();

        let summary = RunSummary {
            started_at,
            elapsed: clock.elapsed(),
            roots_total,
            roots_completed,
            outcomes,
        };
        tracing::info!(
            "Run finished: {} written, {} skipped, {} failed, {} cancelled",
            summary.written(),
            summary.skipped(),
            summary.failures().len(),
            summary.cancelled()
        );
        self.progress.run_finished(&summary);
        summary
    }

    /// Run one tree; returns whether it completed and its leaf outcomes.
    async fn run_root(
        &self,
        tree: FetchTask,
        skip: &SkipSet,
        cancel: &CancellationToken,
    ) -> (bool, Vec<TaskOutcome>) {
        let root = tree.path.clone();
        let nodes = tree.into_nodes();

        if cancel.is_cancelled() {
            tracing::debug!("Not starting {}: cancelled", root);
            let outcomes = nodes
                .into_iter()
                .map(|n| TaskOutcome::new(n.path, n.kind, TaskStatus::Cancelled))
                .collect();
            return (false, outcomes);
        }

        let mut outcomes = Vec::with_capacity(nodes.len());
        for node in nodes {
            let outcome = self.run_leaf(node, skip, cancel).await;
            self.progress.task_finished(&outcome);
            outcomes.push(outcome);
        }

        let completed = !outcomes
            .iter()
            .any(|o| matches!(o.status, TaskStatus::Cancelled));
        if completed {
            self.progress.root_finished(&root);
        }
        (completed, outcomes)
    }

    async fn run_leaf(
        &self,
        node: FetchTask,
        skip: &SkipSet,
        cancel: &CancellationToken,
    ) -> TaskOutcome {
        if node.is_skipped(skip) {
            tracing::debug!("Skip: {}", node.path);
            return TaskOutcome::new(node.path, node.kind, TaskStatus::Skipped);
        }
        if cancel.is_cancelled() {
            return TaskOutcome::new(node.path, node.kind, TaskStatus::Cancelled);
        }

        let started = Instant::now();
        let FetchTask {
            path,
            kind,
            payload,
            size,
            ..
        } = node;

        let result = match payload {
            Payload::None => Ok(0),
            Payload::Text(text) => self.sink.write_text_atomic(&path, &text).await,
            Payload::Stream(request) => self.transfer(&path, size, &request, cancel).await,
        };

        let status = match result {
            Ok(bytes) => {
                tracing::debug!("Wrote {} ({})", path, human_size(bytes));
                TaskStatus::Written {
                    bytes,
                    elapsed: started.elapsed(),
                }
            }
            Err(Error::Cancelled) => TaskStatus::Cancelled,
            Err(e) => {
                tracing::error!("Failed {}: {}", path, e);
                TaskStatus::Failed(e)
            }
        };
        TaskOutcome::new(path, kind, status)
    }

    /// Open a catalog stream and write it to `path`.
    async fn transfer(
        &self,
        path: &str,
        size: Option<u64>,
        request: &StreamRequest,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            opened = request.open(self.catalog.as_ref()) => opened,
        };
        let stream = opened.map_err(|e| match e {
            Error::Transfer { .. } | Error::Cancelled => e,
            other => Error::transfer(path, other),
        })?;

        let mut view = match size {
            Some(size) if size > self.config.progress_threshold => {
                Some(Throttled::new(self.progress.transfer_started(path, size)))
            }
            _ => None,
        };

        let result = self
            .sink
            .write_stream_atomic(path, stream, cancel, |bytes| {
                if let Some(view) = view.as_mut() {
                    view.report(bytes);
                }
            })
            .await;

        if let Some(view) = view {
            view.finish();
        }
        result
    }
}
