//! Configuration management with serde serialization/deserialization
//!
//! This module provides the resolved run configuration consumed by the
//! capture orchestrator, plus the browser launch settings derived from it.
//! Flag/config-file merging lives in the CLI layer; the structures here are
//! immutable for the duration of a run.

use crate::CaptureError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fully-resolved configuration for one capture run
///
/// Produced by the CLI layer from defaults, the optional config file, and
/// command-line flags, in that order of precedence.
///
/// # Examples
///
/// ```rust
/// use visual_baseline::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     tolerance: 2.5,
///     create_diff: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root directory for baseline images and diff artifacts (default: `screenshots`)
    ///
    /// The directory tree under this root mirrors the page tree under the
    /// serving root.
    pub output: PathBuf,

    /// CSS selector scoping every capture to one element (default: empty)
    ///
    /// An empty selector captures the full viewport. A selector that matches
    /// nothing falls back to the viewport without failing the run.
    pub selector: String,

    /// Tolerance used when comparing a capture against its baseline (default: 0)
    ///
    /// Measured as perceptual color distance per pixel; 0 means strict pixel
    /// equality.
    pub tolerance: f64,

    /// Whether to write a diff artifact when a difference is found (default: false)
    pub create_diff: bool,

    /// Browser viewport configuration for captures
    pub viewport: Viewport,

    /// Pause before a (re)capture, letting transient rendering settle (default: 200ms)
    pub settle_delay: Duration,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("screenshots"),
            selector: String::new(),
            tolerance: 0.0,
            create_diff: false,
            viewport: Viewport::default(),
            settle_delay: Duration::from_millis(200),
            chrome_path: None,
        }
    }
}

/// Browser viewport configuration
///
/// # Examples
///
/// ```rust
/// use visual_baseline::Viewport;
///
/// // Desktop viewport (default)
/// let desktop = Viewport::default();
///
/// // Mobile viewport
/// let mobile = Viewport {
///     width: 375,
///     height: 667,
///     device_scale_factor: 2.0,
///     mobile: true,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1024)
    pub width: u32,

    /// Viewport height in pixels (default: 768)
    pub height: u32,

    /// Device pixel ratio for high-DPI displays (default: 1.0)
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

/// One page to render and capture
///
/// `name` is the page path relative to the serving root with the extension
/// stripped; it keys the baseline store and may contain subdirectories.
/// Jobs are immutable and processed in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    pub name: String,
    pub url: String,
}

impl PageJob {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Rejects configurations the run cannot safely start with
pub fn validate_config(config: &Config) -> Result<(), CaptureError> {
    if config.viewport.width == 0 || config.viewport.height == 0 {
        return Err(CaptureError::ConfigurationError(
            "Viewport dimensions must be greater than 0".to_string(),
        ));
    }

    if config.tolerance < 0.0 || !config.tolerance.is_finite() {
        return Err(CaptureError::ConfigurationError(
            "Tolerance must be a non-negative number".to_string(),
        ));
    }

    if config.viewport.device_scale_factor <= 0.0 {
        return Err(CaptureError::ConfigurationError(
            "Device scale factor must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Generate Chrome command-line arguments for the capture session
///
/// Uses a unique user-data directory per process so repeated runs never trip
/// over Chrome's profile singleton.
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let unique_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());

    vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
        "--allow-running-insecure-content".to_string(),
        "--ignore-certificate-errors".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
        format!("--user-data-dir=/tmp/visual-baseline-{}", unique_id),
    ]
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, CaptureError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(CaptureError::BrowserLaunchFailed)
}
