//! Fetch command implementation.
//!
//! Signs in, plans the requested items, reconciles against the destination
//! folder and downloads what is left.

use crate::cli::args::FetchArgs;
use crate::cli::progress::TerminalProgress;
use crate::cli::prompt::{self, TerminalPrompter};
use crate::core::executor::{Executor, ExecutorConfig, RunSummary, TaskStatus};
use crate::core::planner::{Planner, PlannerConfig};
use crate::core::reconciler::{
    AssumeYes, Candidate, KindFilter, Prompter, ReconcileMode, Reconciler,
};
use crate::models::config::{load_config, Config};
use crate::models::session::SessionStore;
use crate::services::catalog::Catalog;
use crate::services::jellyfin::{JellyfinClient, JellyfinConfig};
use crate::utils::format::{hhmmss, human_size, human_size_opt};
use crate::utils::fs::LocalSink;
use crate::{Error, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Destination folder: flag, then config, then the current directory.
pub fn resolve_dest(args: &FetchArgs, config: &Config) -> PathBuf {
    args.dest
        .clone()
        .or_else(|| config.dest.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Run the fetch command.
pub async fn fetch(args: FetchArgs) -> Result<()> {
    let config = load_config();
    let dest = resolve_dest(&args, &config);

    let client = sign_in(&args.server, args.user.as_deref()).await?;
    let catalog: Arc<dyn Catalog> = Arc::new(client);

    // Plan
    let planner = Planner::with_config(
        catalog.clone(),
        PlannerConfig {
            naming: config.naming.clone(),
            with_images: !args.no_image,
        },
    );
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Listing items...");

    let mut planned = 0usize;
    let outcome = planner
        .collect(&args.ids, args.shallow, |task| {
            planned += 1;
            spinner.set_message(format!("Listing items... {} ({})", planned, task.path));
        })
        .await;
    spinner.finish_and_clear();

    for failure in &outcome.failures {
        println!(
            "{} {}: {}",
            "[FAIL]".red(),
            failure.item.bold(),
            failure.error
        );
    }
    if outcome.tasks.is_empty() {
        println!("Nothing to download.");
        return plan_result(outcome.failures.len());
    }
    println!(
        "{} {} item(s), {} task tree(s)",
        "[PLAN]".bold().cyan(),
        outcome.roots.len(),
        outcome.tasks.len()
    );

    // Reconcile
    let sink = LocalSink::new(&dest);
    let filter = KindFilter {
        nfo: !args.no_nfo,
        media: !args.no_media,
        image: !args.no_image,
        external: !args.no_external,
    };
    let prompter: &dyn Prompter = if args.yes { &AssumeYes } else { &TerminalPrompter };
    let reconciler = Reconciler::new(&sink, prompter).with_filter(filter);

    if args.dry_run {
        let candidates = reconciler.scan(&outcome.tasks).await;
        print_candidates(&candidates);
        return plan_result(outcome.failures.len());
    }

    let mode = if args.list {
        ReconcileMode::List
    } else {
        ReconcileMode::Overwrite
    };
    let reconciliation = reconciler.reconcile(&outcome.tasks, mode).await?;
    if !reconciliation.proceed {
        println!("{}", "[ABORT] Nothing downloaded".yellow());
        return Ok(());
    }

    // Execute
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after cleanup...");
            on_signal.cancel();
        }
    });

    let executor = Executor::with_config(
        catalog,
        sink,
        ExecutorConfig {
            concurrency: args.jobs.unwrap_or(config.concurrency).max(1),
            progress_threshold: config.progress_threshold,
        },
    )
    .with_progress(Arc::new(TerminalProgress::new()));

    println!(
        "{} {} to {}",
        "[EXEC]".bold().cyan(),
        human_size(reconciliation.total),
        dest.display()
    );
    let summary = executor
        .run(outcome.tasks, &reconciliation.skip, &cancel)
        .await;
    print_summary(&summary);

    let failed = summary.failures().len() + outcome.failures.len();
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if failed > 0 {
        return Err(Error::other(format!("{} task(s) failed", failed)));
    }
    Ok(())
}

/// Sign in with the saved session, or ask for credentials.
async fn sign_in(server: &str, user: Option<&str>) -> Result<JellyfinClient> {
    let store_path = SessionStore::default_path();
    let mut store = SessionStore::load(&store_path);

    let mut config = JellyfinConfig::new(server, store.device_id());
    config.session = store.get(server).cloned();
    let has_session = config.session.is_some();
    let mut client = JellyfinClient::new(config);

    if has_session {
        match client.current_user().await {
            Ok(user) => {
                tracing::debug!("Reusing session for {}", user.name.as_deref().unwrap_or(&user.id));
                return Ok(client);
            }
            Err(Error::Auth(reason)) => {
                tracing::warn!("Saved session rejected ({}), signing in again", reason);
                client = JellyfinClient::new(JellyfinConfig::new(server, store.device_id()));
            }
            Err(e) => return Err(e),
        }
    }

    let (username, password) = prompt::ask_credentials(server, user)?;
    let session = client.authenticate_by_name(&username, &password).await?;
    store.set(server, session);
    if let Err(e) = store.save(&store_path) {
        tracing::warn!("Could not save session: {}", e);
    }
    Ok(client)
}

fn plan_result(failures: usize) -> Result<()> {
    if failures > 0 {
        Err(Error::other(format!("{} item(s) could not be planned", failures)))
    } else {
        Ok(())
    }
}

fn print_candidates(candidates: &[Candidate]) {
    println!(
        "{:<8} {:>10} {:>10}  {}",
        "Status".bold(),
        "Existing".bold(),
        "Planned".bold(),
        "Path".bold()
    );
    println!("{}", "-".repeat(80));
    for c in candidates {
        let (status, existing) = match &c.existing {
            Some(stat) => ("exists".yellow(), human_size(stat.size)),
            None => ("new".green(), "-".to_string()),
        };
        println!(
            "{:<8} {:>10} {:>10}  {}",
            status,
            existing,
            human_size_opt(c.planned),
            c.path
        );
    }
    println!();
    println!("{} {} file(s)", "[DRY RUN]".bold().yellow(), candidates.len());
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{}", "[Download Summary]".bold().green());
    println!(
        "  {} {} ({})",
        "Written:".bold(),
        summary.written(),
        human_size(summary.bytes_written())
    );
    println!("  {} {}", "Skipped:".bold(), summary.skipped());
    println!("  {} {}", "Failed:".bold(), summary.failures().len());
    if summary.cancelled() > 0 {
        println!("  {} {}", "Cancelled:".bold(), summary.cancelled());
    }
    println!(
        "  {} {}/{}",
        "Items completed:".bold(),
        summary.roots_completed,
        summary.roots_total
    );
    println!("  {} {}", "Elapsed:".bold(), hhmmss(summary.elapsed));

    let failures = summary.failures();
    if !failures.is_empty() {
        println!();
        println!("{}", "[Failures]".bold().red());
        for outcome in failures {
            if let TaskStatus::Failed(ref e) = outcome.status {
                println!("  {} {}", outcome.path, e.to_string().red());
            }
        }
    }
    println!();
}
