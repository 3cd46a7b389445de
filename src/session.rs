//! Exclusive browser session and capture-target resolution
//!
//! One Chrome instance, one page, owned by the capture run for its whole
//! duration. Jobs mutate the session (navigation, rendering state) so all
//! captures go through this single handle sequentially.

use crate::{config, CaptureError, Config, Viewport};
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use image::RgbaImage;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The region of the rendered page a screenshot is scoped to
///
/// Resolved once per page job. A selector that matches nothing resolves to
/// the full viewport rather than failing the job.
pub enum CaptureTarget {
    Viewport,
    Element(Element),
}

/// A captured frame: the raw PNG payload from the browser plus its decoded pixels
pub struct Capture {
    pub raw: Vec<u8>,
    pub image: RgbaImage,
}

pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    /// Launches headless Chrome and opens the single page used for every job.
    pub async fn launch(cfg: &Config) -> Result<Self, CaptureError> {
        let browser_config = config::create_browser_config(cfg)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        let session = Self {
            browser,
            handler,
            page,
        };
        session.apply_viewport(&cfg.viewport).await?;

        info!(
            "Browser session ready ({}x{} viewport)",
            cfg.viewport.width, cfg.viewport.height
        );
        Ok(session)
    }

    async fn apply_viewport(&self, viewport: &Viewport) -> Result<(), CaptureError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width)
            .height(viewport.height)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.mobile)
            .build()
            .map_err(CaptureError::ConfigurationError)?;

        self.page
            .execute(params)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;
        Ok(())
    }

    /// Navigates the session to a page and waits for the load to finish.
    pub async fn goto(&self, url: &str) -> Result<(), CaptureError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| CaptureError::NavigationFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Resolves the capture target for the current page.
    ///
    /// An empty selector means the whole viewport. A selector lookup that
    /// fails for any reason also resolves to the viewport; a missing optional
    /// selector never aborts a run.
    pub async fn resolve_target(&self, selector: &str) -> CaptureTarget {
        if selector.is_empty() {
            return CaptureTarget::Viewport;
        }
        match self.page.find_element(selector).await {
            Ok(element) => {
                debug!("Scoping screenshot to element '{selector}'");
                CaptureTarget::Element(element)
            }
            Err(err) => {
                debug!("Selector '{selector}' not matched ({err}), capturing viewport");
                CaptureTarget::Viewport
            }
        }
    }

    /// Takes a screenshot of the resolved target and decodes it.
    ///
    /// An element capture that fails (for instance a handle gone stale after
    /// re-navigation) falls back to the viewport, mirroring the resolver
    /// contract.
    pub async fn capture(&self, target: &CaptureTarget) -> Result<Capture, CaptureError> {
        let raw = match target {
            CaptureTarget::Viewport => self.capture_viewport().await?,
            CaptureTarget::Element(element) => {
                match element.screenshot(CaptureScreenshotFormat::Png).await {
                    Ok(data) => data,
                    Err(err) => {
                        debug!("Element screenshot failed ({err}), capturing viewport");
                        self.capture_viewport().await?
                    }
                }
            }
        };

        let image = image::load_from_memory(&raw)
            .map_err(|e| CaptureError::ImageDecodeFailed(e.to_string()))?
            .to_rgba8();

        Ok(Capture { raw, image })
    }

    async fn capture_viewport(&self) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    /// Terminates the browser. Callers must reach this on every run path.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        self.handler.abort();
        debug!("Browser session closed");
    }
}
