use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::extract::extract_details;
use crate::fetch::Fetcher;
use crate::runlog::RunLog;
use crate::settings::Settings;
use crate::store::{ContentStore, ItemPath, ItemStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunOutcome {
    /// A scan found nothing left to enrich.
    #[default]
    Complete,
    /// Iteration budget spent with items still waiting. Not a failure.
    IterationCapReached,
}

/// Counters reported after an enrich run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u32,
    pub processed: usize,
    pub succeeded: usize,
    pub empty_results: usize,
    pub errors: usize,
    /// Items still without details when the run ended.
    pub remaining: usize,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn print(&self) {
        println!(
            "Processed {} items in {} iteration(s): {} enriched, {} empty, {} errors.",
            self.processed, self.iterations, self.succeeded, self.empty_results, self.errors,
        );
        match self.outcome {
            RunOutcome::Complete if self.remaining == 0 => println!("All items enriched."),
            RunOutcome::Complete => println!(
                "{} items left empty (settled, not retried).",
                self.remaining
            ),
            RunOutcome::IterationCapReached => println!(
                "Iteration cap reached; {} items still empty.",
                self.remaining
            ),
        }
    }
}

/// An empty item picked up by a scan.
struct Job {
    path: ItemPath,
    title: String,
    url: String,
}

impl Job {
    fn label(&self) -> String {
        format!("{}: {}", self.path, self.title)
    }
}

enum Outcome {
    Extracted(Vec<String>),
    Failed { message: String, permanent: bool },
}

/// Sole writer of the content store during a run. Items are fetched one at
/// a time, and the store is saved after each of them.
pub struct Enricher<F> {
    fetcher: F,
    settings: Settings,
    store: ContentStore,
    log: RunLog,
    progress: bool,
}

impl<F: Fetcher> Enricher<F> {
    pub fn new(fetcher: F, settings: Settings, store: ContentStore, log: RunLog) -> Self {
        Self {
            fetcher,
            settings,
            store,
            log,
            progress: false,
        }
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let max = self.settings.max_iterations;
        let mut summary = RunSummary::default();
        self.log.info(format!(
            "Starting enrichment of {:?} (max {} iterations)",
            self.settings.store_path, max
        ));

        for iteration in 1..=max {
            let batch = self.scan();
            if batch.is_empty() {
                break;
            }
            summary.iterations = iteration;
            self.log.info(format!(
                "Iteration {}/{}: {} items to enrich",
                iteration,
                max,
                batch.len()
            ));

            let pb = self.progress_bar(batch.len())?;
            for (i, job) in batch.iter().enumerate() {
                self.log
                    .info(format!("[{}/{}] {}", i + 1, batch.len(), job.label()));
                let outcome = self.process(job).await;
                self.apply(job, outcome, &mut summary)?;
                self.store
                    .save(&self.settings.store_path)
                    .with_context(|| format!("Aborting run after {}", job.label()))?;
                pb.inc(1);

                if i + 1 < batch.len() {
                    tokio::time::sleep(self.settings.item_delay()).await;
                }
            }
            pb.finish_and_clear();

            let left = self.scan().len();
            self.log.info(format!(
                "Iteration {} finished: {} items still to enrich",
                iteration, left
            ));
            if left == 0 {
                break;
            }
            if iteration < max {
                tokio::time::sleep(self.settings.iteration_delay()).await;
            }
        }

        summary.remaining = self.store.empty_entries().len();
        summary.outcome = if self.scan().is_empty() {
            RunOutcome::Complete
        } else {
            RunOutcome::IterationCapReached
        };
        self.log.info(format!(
            "Run finished: {} processed, {} enriched, {} empty, {} errors, {} remaining",
            summary.processed,
            summary.succeeded,
            summary.empty_results,
            summary.errors,
            summary.remaining
        ));
        Ok(summary)
    }

    /// Fresh list of items to work on, in document order.
    fn scan(&self) -> Vec<Job> {
        self.store
            .empty_entries()
            .into_iter()
            .filter(|e| self.settings.retry_settled || !e.item.is_settled())
            .map(|e| Job {
                title: e.item.title.clone(),
                url: e.item.url.clone(),
                path: e.path,
            })
            .collect()
    }

    async fn process(&self, job: &Job) -> Outcome {
        let body = match self.fetcher.fetch(&job.url).await {
            Ok(body) => body,
            Err(e) => {
                return Outcome::Failed {
                    permanent: e.is_permanent(),
                    message: e.to_string(),
                }
            }
        };

        let title = job.title.clone();
        // On timeout the blocking thread is abandoned, not stopped: the parse
        // runs on until it returns. Only the wait is bounded.
        let task = tokio::task::spawn_blocking(move || extract_details(&body, &title));
        match tokio::time::timeout(self.settings.parse_timeout(), task).await {
            Ok(Ok(details)) => Outcome::Extracted(details),
            Ok(Err(e)) => Outcome::Failed {
                message: format!("extraction failed: {}", e),
                permanent: true,
            },
            Err(_) => Outcome::Failed {
                message: format!(
                    "extraction exceeded {}s",
                    self.settings.parse_timeout().as_secs()
                ),
                permanent: true,
            },
        }
    }

    fn apply(&mut self, job: &Job, outcome: Outcome, summary: &mut RunSummary) -> Result<()> {
        let item = self
            .store
            .item_mut(&job.path)
            .ok_or_else(|| anyhow!("{} is no longer in the store", job.label()))?;
        summary.processed += 1;

        match outcome {
            Outcome::Extracted(details) => {
                let n = details.len();
                item.details = Some(details);
                item.status = Some(ItemStatus::Succeeded);
                item.error = None;
                if n > 0 {
                    summary.succeeded += 1;
                    self.log.info(format!("  -> {} details", n));
                } else {
                    summary.empty_results += 1;
                    self.log.info("  -> no details found");
                }
            }
            Outcome::Failed { message, permanent } => {
                item.details = Some(Vec::new());
                item.status = Some(if permanent {
                    ItemStatus::FailedPermanent
                } else {
                    ItemStatus::FailedTransient
                });
                item.error = Some(message.clone());
                summary.errors += 1;
                self.log.warn(format!("  ! {}", message));
            }
        }
        Ok(())
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar> {
        if !self.progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );
        Ok(pb)
    }
}
