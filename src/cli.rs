use crate::{
    validate_config, BrowserSession, CaptureRunner, Config, PageJob, RunSummary, StaticServer,
    Viewport,
};
use anyhow::Context;
use clap::Parser;
use glob::glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".baselinerc";

const DEFAULT_PORT: u16 = 8081;

#[derive(Parser)]
#[command(name = "visual-baseline")]
#[command(about = "Visual regression baseline capture for rendered pages")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        help = "Glob of pages to serve and capture (e.g. 'tests/visual/*.html')"
    )]
    pub serve: Option<String>,

    #[arg(long, help = "Output directory for baseline images")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Port for the embedded HTTP server")]
    pub port: Option<u16>,

    #[arg(
        long,
        value_parser = parse_viewport_size,
        help = "Initial viewport size as width,height (default: 1024,768)"
    )]
    pub viewport_size: Option<Viewport>,

    #[arg(
        long,
        help = "Scope screenshots to a CSS selector; leave empty for the viewport"
    )]
    pub selector: Option<String>,

    #[arg(long, help = "Tolerance to use when comparing")]
    pub tolerance: Option<f64>,

    #[arg(long, help = "Create a diff image when a difference is found")]
    pub create_diff: bool,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}

/// Optional values read from the JSON config file; every field may be
/// overridden by its CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub output: Option<PathBuf>,
    pub serve: Option<String>,
    pub port: Option<u16>,
    pub selector: Option<String>,
    pub tolerance: Option<f64>,
    pub create_diff: Option<bool>,
    pub viewport_size: Option<String>,
    pub chrome_path: Option<String>,
}

pub struct CliRunner {
    pub config: Config,
    pages_glob: String,
    port: u16,
}

impl CliRunner {
    /// Resolves defaults, the config file, and CLI flags (in that precedence)
    /// into the immutable run configuration.
    pub async fn new(args: &Cli) -> anyhow::Result<Self> {
        let file = load_file_config(args.config.as_deref()).await?;

        let pages_glob = args.serve.clone().or(file.serve).context(
            "no pages to capture; pass --serve or set \"serve\" in the config file",
        )?;

        let viewport = match (&args.viewport_size, &file.viewport_size) {
            (Some(viewport), _) => viewport.clone(),
            (None, Some(raw)) => parse_viewport_size(raw)
                .map_err(|e| anyhow::anyhow!("invalid viewportSize in config file: {e}"))?,
            (None, None) => Viewport::default(),
        };

        let config = Config {
            output: args
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| Config::default().output),
            selector: args.selector.clone().or(file.selector).unwrap_or_default(),
            tolerance: args.tolerance.or(file.tolerance).unwrap_or(0.0),
            create_diff: args.create_diff || file.create_diff.unwrap_or(false),
            viewport,
            settle_delay: Config::default().settle_delay,
            chrome_path: args.chrome_path.clone().or(file.chrome_path),
        };
        validate_config(&config)?;

        Ok(Self {
            config,
            pages_glob,
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
        })
    }

    /// Serves the working directory, discovers the pages, and drives the
    /// capture run. The server is stopped on every exit path.
    pub async fn run(&self) -> anyhow::Result<RunSummary> {
        let server = StaticServer::start(".", self.port).await?;

        let jobs = match discover_pages(&self.pages_glob, &server.host()) {
            Ok(jobs) => jobs,
            Err(err) => {
                server.stop().await;
                return Err(err);
            }
        };
        if jobs.is_empty() {
            server.stop().await;
            anyhow::bail!("pages glob '{}' matched no files", self.pages_glob);
        }

        info!(
            "Capturing {} page(s) into {}",
            jobs.len(),
            self.config.output.display()
        );

        let session = match BrowserSession::launch(&self.config).await {
            Ok(session) => session,
            Err(err) => {
                server.stop().await;
                return Err(err.into());
            }
        };

        let runner = CaptureRunner::new(self.config.clone());
        let result = runner.run(session, &jobs).await;
        server.stop().await;

        let summary = result?;
        info!(
            "Run complete: {} created, {} unchanged, {} updated",
            summary.created, summary.unchanged, summary.updated
        );
        Ok(summary)
    }
}

async fn load_file_config(path: Option<&Path>) -> anyhow::Result<FileConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                info!("No config file found, using defaults");
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Expands the pages glob into one job per page file.
///
/// The serving root is the pattern prefix up to the first wildcard; page
/// names are paths relative to that root with the extension stripped, so the
/// output tree mirrors the page tree. Jobs come out in glob order.
pub fn discover_pages(pattern: &str, host: &str) -> anyhow::Result<Vec<PageJob>> {
    let base = Url::parse(host).with_context(|| format!("invalid host {host}"))?;
    let root = glob_root(pattern);

    let mut jobs = Vec::new();
    for entry in glob(pattern).context("invalid pages glob")? {
        let path = entry.context("unreadable glob entry")?;
        if !path.is_file() {
            continue;
        }
        let rel = path.to_string_lossy().replace('\\', "/");
        let url = base
            .join(&rel)
            .with_context(|| format!("cannot build URL for {rel}"))?;
        jobs.push(PageJob::new(page_name(&path, &root), url));
    }
    Ok(jobs)
}

/// Directory prefix of the pattern up to its first wildcard
fn glob_root(pattern: &str) -> String {
    let wildcard = pattern
        .find(|c| matches!(c, '*' | '?' | '['))
        .unwrap_or(pattern.len());
    match pattern[..wildcard].rfind('/') {
        Some(idx) => pattern[..=idx].to_string(),
        None => String::new(),
    }
}

fn page_name(path: &Path, root: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            format!("{}/", parent.to_string_lossy().replace('\\', "/"))
        }
        _ => String::new(),
    };
    let full = format!("{dir}{stem}");
    match full.strip_prefix(root) {
        Some(rel) => rel.to_string(),
        None => full,
    }
}

fn parse_viewport_size(value: &str) -> Result<Viewport, String> {
    let (width, height) = value
        .split_once(',')
        .ok_or_else(|| "expected <width>,<height>".to_string())?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid width: {e}"))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid height: {e}"))?;
    if width == 0 || height == 0 {
        return Err("viewport dimensions must be greater than 0".to_string());
    }
    Ok(Viewport {
        width,
        height,
        ..Viewport::default()
    })
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewport_size() {
        let viewport = parse_viewport_size("1280,720").unwrap();
        assert_eq!(viewport.width, 1280);
        assert_eq!(viewport.height, 720);

        assert!(parse_viewport_size("1280").is_err());
        assert!(parse_viewport_size("0,720").is_err());
        assert!(parse_viewport_size("wide,tall").is_err());
    }

    #[test]
    fn test_glob_root() {
        assert_eq!(glob_root("tests/visual/*.html"), "tests/visual/");
        assert_eq!(glob_root("tests/**/*.html"), "tests/");
        assert_eq!(glob_root("*.html"), "");
        assert_eq!(glob_root("tests/visual/home.html"), "tests/visual/");
    }

    #[test]
    fn test_page_name_strips_root_and_extension() {
        assert_eq!(
            page_name(Path::new("tests/visual/home.html"), "tests/visual/"),
            "home"
        );
        assert_eq!(
            page_name(Path::new("tests/visual/sub/about.html"), "tests/visual/"),
            "sub/about"
        );
        assert_eq!(page_name(Path::new("home.html"), ""), "home");
    }

    #[test]
    fn test_file_config_uses_camel_case_keys() {
        let raw = r#"{
            "output": "shots",
            "serve": "pages/*.html",
            "createDiff": true,
            "viewportSize": "800,600",
            "tolerance": 2.5
        }"#;
        let file: FileConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(file.output, Some(PathBuf::from("shots")));
        assert_eq!(file.serve.as_deref(), Some("pages/*.html"));
        assert_eq!(file.create_diff, Some(true));
        assert_eq!(file.viewport_size.as_deref(), Some("800,600"));
        assert_eq!(file.tolerance, Some(2.5));
    }
}
