//! Existing-file reconciliation.
//!
//! Before anything is downloaded, every destination of the plan is checked
//! against the destination folder. The user then picks what to (over)write
//! and the answer becomes the run's [`SkipSet`].

use crate::models::task::{FetchKind, FetchTask, SkipSet};
use crate::utils::format::{human_size, human_size_opt};
use crate::utils::fs::{FileStat, LocalSink};
use crate::Result;
use futures::stream::{self, StreamExt};

/// Concurrent stat calls while scanning destinations.
const STAT_CONCURRENCY: usize = 16;

/// Interactive decisions needed by the reconciler.
pub trait Prompter: Send + Sync {
    /// Multi-select; returns the indices of the selected choices.
    fn select_many(&self, message: &str, choices: &[Choice]) -> Result<Vec<usize>>;

    fn confirm(&self, message: &str) -> Result<bool>;
}

/// One selectable line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    /// Pre-selected.
    pub checked: bool,
}

/// Non-interactive prompter: keeps the defaults and confirms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn select_many(&self, _message: &str, choices: &[Choice]) -> Result<Vec<usize>> {
        Ok(choices
            .iter()
            .enumerate()
            .filter(|(_, c)| c.checked)
            .map(|(i, _)| i)
            .collect())
    }

    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(true)
    }
}

/// How the user is asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Offer every destination as a "files to download" multi-select.
    List,
    /// Offer only existing destinations for overwrite, then confirm the total.
    #[default]
    Overwrite,
}

/// Which task kinds are downloaded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindFilter {
    pub nfo: bool,
    pub media: bool,
    pub image: bool,
    pub external: bool,
}

impl Default for KindFilter {
    fn default() -> Self {
        Self {
            nfo: true,
            media: true,
            image: true,
            external: true,
        }
    }
}

impl KindFilter {
    pub fn allows(&self, kind: FetchKind) -> bool {
        match kind {
            FetchKind::Folder => true,
            FetchKind::Nfo => self.nfo,
            FetchKind::Media => self.media,
            FetchKind::Image => self.image,
            FetchKind::External => self.external,
        }
    }
}

/// A destination and what is already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: String,
    pub kind: FetchKind,
    /// Planned size, if known.
    pub planned: Option<u64>,
    /// Existing file, if any.
    pub existing: Option<FileStat>,
}

impl Candidate {
    /// `path old => new` for existing files, `path size` otherwise.
    pub fn label(&self) -> String {
        match (&self.existing, self.planned) {
            (Some(stat), planned) => format!(
                "{} {} => {}",
                self.path,
                human_size(stat.size),
                human_size_opt(planned)
            ),
            (None, Some(size)) => format!("{} {}", self.path, human_size(size)),
            (None, None) => self.path.clone(),
        }
    }
}

/// Outcome of reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Destinations that passed the kind filter, in plan order.
    pub candidates: Vec<Candidate>,
    /// Paths not to write this run.
    pub skip: SkipSet,
    /// Total bytes to download (unknown sizes count as zero).
    pub total: u64,
    /// Whether some payloads to download have an unknown size.
    pub has_unknown_sizes: bool,
    /// Whether to go ahead with the download.
    pub proceed: bool,
}

/// Turns existing files and user decisions into a skip set.
pub struct Reconciler<'a> {
    sink: &'a LocalSink,
    prompter: &'a dyn Prompter,
    filter: KindFilter,
}

impl<'a> Reconciler<'a> {
    pub fn new(sink: &'a LocalSink, prompter: &'a dyn Prompter) -> Self {
        Self {
            sink,
            prompter,
            filter: KindFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: KindFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stat every allowed destination of the plan.
    ///
    /// Stat failures other than "not found" are logged and treated as absent.
    pub async fn scan(&self, trees: &[FetchTask]) -> Vec<Candidate> {
        let destinations: Vec<_> = trees
            .iter()
            .flat_map(|t| t.all_destinations())
            .filter(|d| self.filter.allows(d.kind))
            .collect();

        stream::iter(destinations)
            .map(|d| async move {
                let existing = match self.sink.stat(d.path).await {
                    Ok(stat) => stat,
                    Err(e) => {
                        tracing::warn!("Cannot stat {}: {}", d.path, e);
                        None
                    }
                };
                Candidate {
                    path: d.path.to_string(),
                    kind: d.kind,
                    planned: d.size,
                    existing,
                }
            })
            .buffered(STAT_CONCURRENCY)
            .collect()
            .await
    }

    /// Reconcile the plan against the destination folder.
    pub async fn reconcile(
        &self,
        trees: &[FetchTask],
        mode: ReconcileMode,
    ) -> Result<Reconciliation> {
        let candidates = self.scan(trees).await;
        let mut skip = self.filtered_out(trees);

        let proceed = match mode {
            ReconcileMode::List => {
                let choices: Vec<Choice> = candidates
                    .iter()
                    .map(|c| Choice {
                        label: c.label(),
                        checked: c.existing.is_none(),
                    })
                    .collect();
                let selected = self.prompter.select_many("Files to download:", &choices)?;
                for (i, candidate) in candidates.iter().enumerate() {
                    if !selected.contains(&i) {
                        skip.mark(candidate.path.clone());
                    }
                }
                true
            }
            ReconcileMode::Overwrite => {
                let existing: Vec<&Candidate> =
                    candidates.iter().filter(|c| c.existing.is_some()).collect();
                if !existing.is_empty() {
                    let choices: Vec<Choice> = existing
                        .iter()
                        .map(|c| Choice {
                            label: c.label(),
                            checked: false,
                        })
                        .collect();
                    let overwrite = self
                        .prompter
                        .select_many("Overwrite existing files?", &choices)?;
                    for (i, candidate) in existing.iter().enumerate() {
                        if !overwrite.contains(&i) {
                            skip.mark(candidate.path.clone());
                        }
                    }
                }

                let (total, unknown) = totals(trees, &skip);
                let mut message = format!("Download {}?", human_size(total));
                if unknown {
                    message = format!("Download {} (plus files of unknown size)?", human_size(total));
                }
                self.prompter.confirm(&message)?
            }
        };

        let (total, has_unknown_sizes) = totals(trees, &skip);
        tracing::debug!(
            "Reconciled {} destinations, {} skipped, {} to download",
            candidates.len(),
            skip.len(),
            human_size(total)
        );

        Ok(Reconciliation {
            candidates,
            skip,
            total,
            has_unknown_sizes,
            proceed,
        })
    }

    /// Destinations excluded by the kind filter.
    fn filtered_out(&self, trees: &[FetchTask]) -> SkipSet {
        trees
            .iter()
            .flat_map(|t| t.all_destinations())
            .filter(|d| !self.filter.allows(d.kind))
            .map(|d| d.path)
            .collect()
    }
}

fn totals(trees: &[FetchTask], skip: &SkipSet) -> (u64, bool) {
    let total = trees.iter().map(|t| t.total_size(skip)).sum();
    let unknown = trees.iter().any(|t| !t.known_size(skip));
    (total, unknown)
}
