//! Baseline image store
//!
//! A directory tree keyed by page name holding at most one rolling baseline
//! per page (`<root>/<name>.png`) plus any number of timestamped diff
//! artifacts (`<root>/<name>_diff_<unixMillis>.png`). Presence of the
//! baseline file is the only signal distinguishing a first run from a
//! regression run; diff artifacts are never overwritten or cleaned up here.

use crate::{codec, CaptureError};
use chrono::Utc;
use image::RgbaImage;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BaselineStore {
    root: PathBuf,
}

impl BaselineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn baseline_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.png"))
    }

    pub fn diff_path(&self, name: &str, timestamp_millis: i64) -> PathBuf {
        self.root.join(format!("{name}_diff_{timestamp_millis}.png"))
    }

    /// Creates the directory a page's artifacts land in, parents included.
    pub async fn ensure_page_dir(&self, name: &str) -> Result<(), CaptureError> {
        if let Some(parent) = self.baseline_path(name).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    pub fn has_baseline(&self, name: &str) -> bool {
        self.baseline_path(name).is_file()
    }

    pub async fn load_baseline(&self, name: &str) -> Result<RgbaImage, CaptureError> {
        let bytes = tokio::fs::read(self.baseline_path(name)).await?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    /// Writes (or overwrites) the baseline from a raw PNG capture payload,
    /// optimized on the way down.
    pub async fn write_baseline(&self, name: &str, raw_png: &[u8]) -> Result<PathBuf, CaptureError> {
        let path = self.baseline_path(name);
        tokio::fs::write(&path, codec::optimize_png(raw_png)).await?;
        Ok(path)
    }

    /// Writes a new timestamped diff artifact for the page.
    pub async fn write_diff(&self, name: &str, diff: &RgbaImage) -> Result<PathBuf, CaptureError> {
        let path = self.diff_path(name, Utc::now().timestamp_millis());
        tokio::fs::write(&path, codec::encode_png(diff)?).await?;
        Ok(path)
    }
}
