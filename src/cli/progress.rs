//! Terminal progress rendering with indicatif.

use crate::core::executor::{RunSummary, TaskOutcome, TaskStatus};
use crate::core::progress::{ProgressSink, TransferProgress};
use crate::utils::format::{hhmmss, human_size};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Overall root counter plus one bar per large transfer.
pub struct TerminalProgress {
    multi: MultiProgress,
    overall: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(0));
        overall.set_style(style(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ));
        Self { multi, overall }
    }

    fn println(&self, line: String) {
        if self.multi.println(&line).is_err() {
            eprintln!("{}", line);
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn run_started(&self, roots: usize, total_bytes: u64) {
        self.overall.set_length(roots as u64);
        self.overall
            .set_message(format!("items ({} total)", human_size(total_bytes)));
    }

    fn transfer_started(&self, path: &str, size: u64) -> Box<dyn TransferProgress> {
        let bar = self
            .multi
            .insert_before(&self.overall, ProgressBar::new(size));
        bar.set_style(style(
            "  [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        ));
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        bar.set_message(name.clone());
        Box::new(TerminalTransfer { bar, name })
    }

    fn task_finished(&self, outcome: &TaskOutcome) {
        match &outcome.status {
            TaskStatus::Written { bytes, elapsed } => self.println(format!(
                "{:>10} {:>8}  {}",
                human_size(*bytes),
                hhmmss(*elapsed),
                outcome.path
            )),
            TaskStatus::Failed(e) => self.println(format!(
                "{} {}: {}",
                "[FAIL]".red(),
                outcome.path,
                e
            )),
            TaskStatus::Skipped | TaskStatus::Cancelled => {}
        }
    }

    fn root_finished(&self, _root: &str) {
        self.overall.inc(1);
    }

    fn run_finished(&self, _summary: &RunSummary) {
        self.overall.finish_and_clear();
    }
}

struct TerminalTransfer {
    bar: ProgressBar,
    name: String,
}

impl TransferProgress for TerminalTransfer {
    fn update(&mut self, bytes: u64, throughput: f64) {
        self.bar.set_position(bytes);
        self.bar.set_message(format!(
            "{}/s {}",
            human_size(throughput as u64),
            self.name
        ));
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}
