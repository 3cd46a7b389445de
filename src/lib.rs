//! # Visual Baseline
//!
//! A visual-regression baseline manager: drives a headless Chrome session to
//! render a set of pages, captures screenshots, and keeps one rolling
//! baseline image per page, recording pixel-level differences across runs.
//!
//! Every run walks its pages strictly in order on a single shared browser
//! session. A page without a baseline gets one; a page with a baseline is
//! compared against it perceptually. A first difference is retried once
//! after a short settle delay to absorb animation/render jitter — only a
//! difference that survives the retry overwrites the baseline (and, when
//! enabled, writes a timestamped diff artifact highlighting the divergent
//! pixels).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use visual_baseline::{BrowserSession, CaptureRunner, Config, PageJob};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         create_diff: true,
//!         ..Default::default()
//!     };
//!
//!     let jobs = vec![PageJob::new("home", "http://localhost:8081/pages/home.html")];
//!
//!     let session = BrowserSession::launch(&config).await?;
//!     let runner = CaptureRunner::new(config);
//!     let summary = runner.run(session, &jobs).await?;
//!     println!(
//!         "{} created, {} unchanged, {} updated",
//!         summary.created, summary.unchanged, summary.updated
//!     );
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # First run: capture baselines for every page under tests/visual/
//! visual-baseline --serve 'tests/visual/*.html' --output tests/baselines
//!
//! # Regression run with diff artifacts on differences
//! visual-baseline --serve 'tests/visual/*.html' --output tests/baselines --create-diff
//!
//! # Scope captures to one element
//! visual-baseline --serve 'tests/visual/*.html' --selector '#widget' --tolerance 2.5
//! ```
//!
//! Defaults may also come from a JSON `.baselinerc` in the working directory;
//! CLI flags win over file values.

/// Configuration, page jobs, and browser launch settings
pub mod config;

/// Error types
pub mod error;

/// Exclusive browser session and capture-target resolution
pub mod session;

/// Perceptual image comparison and diff rendering
pub mod compare;

/// Lossless PNG encoding for baselines and diff artifacts
pub mod codec;

/// Baseline store: rolling baselines plus timestamped diff artifacts
pub mod baseline;

/// Capture orchestration and the per-page baseline decision
pub mod capture;

/// Embedded static file server for the pages under test
pub mod server;

/// Command-line interface implementation
pub mod cli;


pub use baseline::*;
pub use capture::*;
pub use cli::*;
pub use compare::*;
pub use config::*;
pub use error::*;
pub use server::*;
pub use session::*;
