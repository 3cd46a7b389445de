//! Capture orchestration and the per-page baseline decision
//!
//! Pages are processed strictly in input order on the one shared browser
//! session: ensure the output directory, navigate, resolve the capture
//! target, screenshot, then decide between creating, keeping, or overwriting
//! the baseline. A first difference is treated as possibly transient; after a
//! short settle delay the page is captured once more and that second
//! comparison is authoritative.

use crate::{
    compare, BaselineStore, BrowserSession, Capture, CaptureError, CompareOptions, Config, PageJob,
};
use std::future::Future;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// What a run did for a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// First run for this page; a fresh baseline was written
    Created(PathBuf),
    /// Capture matched the existing baseline within tolerance
    Unchanged,
    /// A stable difference was found; the baseline was overwritten
    Updated { diff: Option<PathBuf> },
}

/// Per-run outcome counts, reported once the job queue drains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub created: usize,
    pub unchanged: usize,
    pub updated: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &PageOutcome) {
        match outcome {
            PageOutcome::Created(_) => self.created += 1,
            PageOutcome::Unchanged => self.unchanged += 1,
            PageOutcome::Updated { .. } => self.updated += 1,
        }
    }
}

pub struct CaptureRunner {
    config: Config,
    store: BaselineStore,
}

impl CaptureRunner {
    pub fn new(config: Config) -> Self {
        let store = BaselineStore::new(&config.output);
        Self { config, store }
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Runs every job against the session.
    ///
    /// The session is closed when the run finishes, whether it succeeded or
    /// aborted on an error.
    pub async fn run(
        &self,
        session: BrowserSession,
        jobs: &[PageJob],
    ) -> Result<RunSummary, CaptureError> {
        let result = self.run_jobs(&session, jobs).await;
        session.close().await;
        result
    }

    async fn run_jobs(
        &self,
        session: &BrowserSession,
        jobs: &[PageJob],
    ) -> Result<RunSummary, CaptureError> {
        let mut summary = RunSummary {
            total: jobs.len(),
            ..Default::default()
        };

        for job in jobs {
            let outcome = self.run_job(session, job).await?;
            match &outcome {
                PageOutcome::Created(path) => {
                    info!("Baseline created: {}", path.display());
                }
                PageOutcome::Unchanged => {
                    info!("No difference for {}", job.name);
                }
                PageOutcome::Updated { diff } => {
                    warn!("Difference found for {}, baseline updated", job.name);
                    if let Some(path) = diff {
                        info!("Diff image written: {}", path.display());
                    }
                }
            }
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn run_job(
        &self,
        session: &BrowserSession,
        job: &PageJob,
    ) -> Result<PageOutcome, CaptureError> {
        info!("Loading {}...", job.url);
        self.store.ensure_page_dir(&job.name).await?;
        session.goto(&job.url).await?;

        let target = session.resolve_target(&self.config.selector).await;

        // Give a fresh page the settle delay before its very first capture;
        // regression runs capture immediately and only settle on a retry.
        if !self.store.has_baseline(&job.name) {
            sleep(self.config.settle_delay).await;
        }
        let first = session.capture(&target).await?;

        let settle_delay = self.config.settle_delay;
        apply_baseline_policy(
            &self.store,
            &job.name,
            first,
            || async move {
                sleep(settle_delay).await;
                session.capture(&target).await
            },
            &self.config,
        )
        .await
    }
}

/// Decides what the captured frame means for the page's baseline.
///
/// No baseline on disk: the capture becomes the baseline, no comparison.
/// Otherwise the capture is compared against the baseline with the run's
/// tolerance; on a mismatch `recapture` is invoked exactly once and the
/// second comparison against the *original* baseline wins. A final mismatch
/// writes the diff artifact (when enabled) before the baseline is
/// overwritten, since the diff is defined relative to the pre-overwrite
/// baseline.
pub async fn apply_baseline_policy<F, Fut>(
    store: &BaselineStore,
    name: &str,
    first: Capture,
    recapture: F,
    config: &Config,
) -> Result<PageOutcome, CaptureError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Capture, CaptureError>>,
{
    if !store.has_baseline(name) {
        let path = store.write_baseline(name, &first.raw).await?;
        return Ok(PageOutcome::Created(path));
    }

    let baseline = store.load_baseline(name).await?;
    let options = CompareOptions::new(config.tolerance);

    let mut latest = first;
    let mut comparison = compare::compare(&latest.image, &baseline, &options);

    if !comparison.equal {
        debug!(
            "Difference detected for {name} ({} pixels), retrying after settle delay",
            comparison.divergent_pixels
        );
        latest = recapture().await?;
        comparison = compare::compare(&latest.image, &baseline, &options);
    }

    if comparison.equal {
        return Ok(PageOutcome::Unchanged);
    }

    let diff = if config.create_diff {
        let image = compare::render_diff(&latest.image, &baseline, &options);
        Some(store.write_diff(name, &image).await?)
    } else {
        None
    };

    store.write_baseline(name, &latest.raw).await?;
    Ok(PageOutcome::Updated { diff })
}
