//! Integration tests for reconciliation and execution.
//!
//! Tests cover:
//! - Existing files and the overwrite prompt
//! - Atomic writes on stream failure
//! - Failure isolation between roots
//! - Submission order with concurrent roots
//! - Cancellation

mod common;

use common::*;
use jellyfetch::core::executor::{Executor, ExecutorConfig, TaskStatus};
use jellyfetch::core::planner::Planner;
use jellyfetch::core::reconciler::{AssumeYes, Choice, Prompter, ReconcileMode, Reconciler};
use jellyfetch::models::task::{FetchTask, SkipSet};
use jellyfetch::utils::fs::LocalSink;
use jellyfetch::Result;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Declines every overwrite and confirms the download.
#[derive(Default)]
struct DeclineOverwrites {
    offered: Mutex<Vec<String>>,
    confirmed: Mutex<Vec<String>>,
}

impl Prompter for DeclineOverwrites {
    fn select_many(&self, _message: &str, choices: &[Choice]) -> Result<Vec<usize>> {
        let mut offered = self.offered.lock().unwrap();
        offered.extend(choices.iter().map(|c| c.label.clone()));
        Ok(Vec::new())
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        self.confirmed.lock().unwrap().push(message.to_string());
        Ok(true)
    }
}

fn movie_catalog() -> MockCatalog {
    MockCatalog::new()
        .with_item(movie())
        .with_stream("media:m-src", b"movie bytes")
        .with_stream("subtitle:m:2", b"1\n00:00:01,000 --> 00:00:02,000\nhi\n")
}

async fn plan(catalog: Arc<MockCatalog>, roots: &[&str]) -> Vec<FetchTask> {
    let roots: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
    Planner::new(catalog).collect(&roots, false, |_| {}).await.tasks
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

fn part_files(root: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        for entry in std::fs::read_dir(dir).unwrap().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                dirs.push(path);
            } else if path.to_string_lossy().ends_with(".part") {
                found.push(path.to_string_lossy().into_owned());
            }
        }
    }
    found
}

// ========== RECONCILE + EXECUTE ==========

#[tokio::test]
async fn test_existing_media_declined_is_not_downloaded() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("M (2020)")).unwrap();
    std::fs::write(temp_dir.path().join("M (2020)/M.mkv"), "old").unwrap();

    let catalog = Arc::new(movie_catalog());
    let tasks = plan(catalog.clone(), &["m"]).await;
    let before = tasks[0].total_size(&SkipSet::new());

    let sink = LocalSink::new(temp_dir.path());
    let prompter = DeclineOverwrites::default();
    let reconciliation = Reconciler::new(&sink, &prompter)
        .reconcile(&tasks, ReconcileMode::Overwrite)
        .await
        .unwrap();

    let offered = prompter.offered.lock().unwrap().clone();
    assert_eq!(offered.len(), 1);
    assert!(offered[0].starts_with("M (2020)/M.mkv 3 B => "));
    assert!(reconciliation.skip.contains("M (2020)/M.mkv"));
    assert_eq!(reconciliation.skip.len(), 1);
    assert_eq!(reconciliation.total, before - 1_000_000_000);

    let executor = Executor::new(catalog.clone(), sink);
    let summary = executor
        .run(tasks, &reconciliation.skip, &CancellationToken::new())
        .await;

    assert!(summary.is_success());
    assert_eq!(summary.written(), 2);
    assert_eq!(summary.skipped(), 1);
    assert_eq!(read(temp_dir.path(), "M (2020)/M.mkv"), "old");
    assert!(read(temp_dir.path(), "M (2020)/M.nfo").starts_with("<?xml"));
    assert!(read(temp_dir.path(), "M (2020)/M.eng.srt").contains("hi"));
    // The skipped media stream is never opened.
    assert_eq!(catalog.opened(), vec!["subtitle:m:2"]);
}

#[tokio::test]
async fn test_execution_order_metadata_first() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(movie_catalog());
    let tasks = plan(catalog.clone(), &["m"]).await;

    let executor = Executor::new(catalog, LocalSink::new(temp_dir.path()));
    let summary = executor
        .run(tasks, &SkipSet::new(), &CancellationToken::new())
        .await;

    let order: Vec<&str> = summary.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(
        order,
        vec!["M (2020)/M.nfo", "M (2020)/M.mkv", "M (2020)/M.eng.srt"]
    );
    assert_eq!(read(temp_dir.path(), "M (2020)/M.mkv"), "movie bytes");
    assert_eq!(summary.roots_completed, 1);
}

// ========== FAILURES ==========

#[tokio::test]
async fn test_broken_stream_leaves_previous_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("M (2020)")).unwrap();
    std::fs::write(temp_dir.path().join("M (2020)/M.mkv"), "old").unwrap();

    let catalog = Arc::new(
        MockCatalog::new()
            .with_item(movie())
            .with_broken_stream("media:m-src", b"partial new bytes")
            .with_stream("subtitle:m:2", b"srt"),
    );
    let tasks = plan(catalog.clone(), &["m"]).await;

    // Empty skip set: the existing file is overwritten.
    let executor = Executor::new(catalog, LocalSink::new(temp_dir.path()));
    let summary = executor
        .run(tasks, &SkipSet::new(), &CancellationToken::new())
        .await;

    let failures = summary.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "M (2020)/M.mkv");
    // Siblings after the failing payload still run.
    assert_eq!(read(temp_dir.path(), "M (2020)/M.eng.srt"), "srt");
    assert_eq!(read(temp_dir.path(), "M (2020)/M.mkv"), "old");
    assert!(part_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_failed_root_does_not_stop_others() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(
        show()
            .with_item(movie())
            .with_stream("subtitle:m:2", b"srt")
            .with_stream("media:e1-src", b"episode one")
            .with_stream("media:e2-src", b"episode two"),
    );
    let tasks = plan(catalog.clone(), &["m", "show"]).await;

    let executor = Executor::with_config(
        catalog,
        LocalSink::new(temp_dir.path()),
        ExecutorConfig {
            concurrency: 3,
            ..Default::default()
        },
    );
    let summary = executor
        .run(tasks, &SkipSet::new(), &CancellationToken::new())
        .await;

    // The movie stream is missing from the catalog.
    let failures = summary.failures();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0].status, TaskStatus::Failed(_)));
    assert_eq!(
        read(temp_dir.path(), "Show Pilot (2001)/Season 1/Show S01E02.mkv"),
        "episode two"
    );
    assert_eq!(summary.roots_completed, summary.roots_total);
}

#[tokio::test]
async fn test_outcomes_follow_submission_order() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(
        show()
            .with_item(movie())
            .with_delayed_stream("media:m-src", b"slow movie", Duration::from_millis(200))
            .with_stream("subtitle:m:2", b"srt")
            .with_stream("media:e1-src", b"episode one")
            .with_stream("media:e2-src", b"episode two"),
    );
    let tasks = plan(catalog.clone(), &["m", "show"]).await;

    let executor = Executor::with_config(
        catalog.clone(),
        LocalSink::new(temp_dir.path()),
        ExecutorConfig {
            concurrency: 8,
            ..Default::default()
        },
    );
    let summary = executor
        .run(tasks, &SkipSet::new(), &CancellationToken::new())
        .await;

    assert!(summary.is_success());
    let order: Vec<&str> = summary.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "M (2020)/M.nfo",
            "M (2020)/M.mkv",
            "M (2020)/M.eng.srt",
            "Show Pilot (2001)/tvshow.nfo",
            "Show Pilot (2001)/Season 1/season.nfo",
            "Show Pilot (2001)/Season 1/Show S01E01.nfo",
            "Show Pilot (2001)/Season 1/Show S01E01.mkv",
            "Show Pilot (2001)/Season 1/Show S01E02.nfo",
            "Show Pilot (2001)/Season 1/Show S01E02.mkv",
        ]
    );

    // The episodes ran while the movie was still waiting on its stream.
    let opened = catalog.opened();
    let position = |key: &str| opened.iter().position(|k| k == key).unwrap();
    assert!(position("media:e2-src") < position("subtitle:m:2"));
}

// ========== CANCELLATION ==========

#[tokio::test]
async fn test_cancel_before_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(movie_catalog());
    let tasks = plan(catalog.clone(), &["m"]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = Executor::new(catalog, LocalSink::new(temp_dir.path()))
        .run(tasks, &SkipSet::new(), &cancel)
        .await;

    assert_eq!(summary.cancelled(), 3);
    assert_eq!(summary.roots_completed, 0);
    assert!(std::fs::read_dir(temp_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_cancel_mid_transfer_removes_part_file() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(
        MockCatalog::new()
            .with_item(movie())
            .with_stalled_stream("media:m-src")
            .with_stream("subtitle:m:2", b"srt"),
    );
    let tasks = plan(catalog.clone(), &["m"]).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = Executor::new(catalog, LocalSink::new(temp_dir.path()))
        .run(tasks, &SkipSet::new(), &cancel)
        .await;

    let statuses: Vec<&TaskStatus> = summary.outcomes.iter().map(|o| &o.status).collect();
    assert!(matches!(statuses[0], TaskStatus::Written { .. }));
    assert!(matches!(statuses[1], TaskStatus::Cancelled));
    assert!(matches!(statuses[2], TaskStatus::Cancelled));
    assert!(!temp_dir.path().join("M (2020)/M.mkv").exists());
    assert!(part_files(temp_dir.path()).is_empty());
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_assume_yes_keeps_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("M (2020)")).unwrap();
    std::fs::write(temp_dir.path().join("M (2020)/M.nfo"), "x").unwrap();

    let catalog = Arc::new(movie_catalog());
    let tasks = plan(catalog, &["m"]).await;
    let sink = LocalSink::new(temp_dir.path());

    let reconciliation = Reconciler::new(&sink, &AssumeYes)
        .reconcile(&tasks, ReconcileMode::Overwrite)
        .await
        .unwrap();

    assert!(reconciliation.proceed);
    assert_eq!(
        reconciliation.skip.iter().collect::<Vec<_>>(),
        vec!["M (2020)/M.nfo"]
    );
}
