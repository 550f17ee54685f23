use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ChromiumSection, WaitSection};

use super::error::{CrawlError, CrawlResult};
use super::scripts;

/// One product card as reported by the listing scraper script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductCardRaw {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub link: Option<String>,
}

/// One review entry as reported by the review scraper script. Absent
/// sub-elements arrive as None; the extractor substitutes defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReviewEntryRaw {
    pub customer_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub rating_text: Option<String>,
}

/// Seam over one live browser-automation session. Exactly one caller drives
/// a session at a time; recovery replaces the whole boxed value when the
/// session dies.
#[async_trait(?Send)]
pub trait CrawlSession {
    async fn goto(&mut self, url: &str) -> CrawlResult<()>;
    async fn idle(&mut self, range_ms: (u64, u64)) -> CrawlResult<()>;
    async fn scroll_by(&mut self, delta_y: f64) -> CrawlResult<()>;
    async fn element_count(&mut self, selector: &str) -> CrawlResult<usize>;
    async fn click_first(&mut self, selectors: &[String]) -> CrawlResult<bool>;
    async fn click_link_by_text(&mut self, scope: &str, text: &str) -> CrawlResult<bool>;
    async fn click_containing(&mut self, scope: &str, needles: &[String]) -> CrawlResult<bool>;
    async fn pager_labels(&mut self, scope: &str) -> CrawlResult<Vec<String>>;
    async fn radio_checked(&mut self, selector: &str) -> CrawlResult<bool>;
    async fn force_check_radio(&mut self, selector: &str) -> CrawlResult<bool>;
    async fn product_cards(&mut self, script: &str) -> CrawlResult<Vec<ProductCardRaw>>;
    async fn review_entries(&mut self, script: &str) -> CrawlResult<Vec<ReviewEntryRaw>>;
    async fn shutdown(&mut self) -> CrawlResult<()>;
}

#[async_trait(?Send)]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> CrawlResult<Box<dyn CrawlSession>>;
}

/// Polls until any selector matches, scrolling between polls to trigger the
/// listing's lazy rendering. Bounded by the configured timeout; expiry is a
/// normal `false`, never an error.
pub async fn wait_for_any(
    session: &mut dyn CrawlSession,
    selectors: &[String],
    waits: &WaitSection,
) -> CrawlResult<bool> {
    let interval = waits.poll_interval_ms.max(1);
    let polls = (waits.condition_timeout_ms / interval).max(1);
    for _ in 0..polls {
        for selector in selectors {
            if session.element_count(selector).await? > 0 {
                return Ok(true);
            }
        }
        session.scroll_by(900.0).await?;
        session.idle((interval, interval)).await?;
    }
    Ok(false)
}

/// Chromium-backed session. Each value owns its own browser process; a
/// recreate is a full relaunch, which is what invalidates every reference
/// to the dead session at once.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserSession {
    pub async fn launch(config: &ChromiumSection) -> CrawlResult<Self> {
        let mut builder = ChromiumConfig::builder();
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(timeout) = config.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        let mut args = vec![
            format!("--lang={}", config.lang),
            format!("--user-agent={}", config.user_agent),
            "--disable-dev-shm-usage".to_string(),
            "--disable-background-timer-throttling".to_string(),
            "--password-store=basic".to_string(),
        ];
        if config.disable_gpu {
            args.push("--disable-gpu".to_string());
        }
        builder = builder.args(args);

        let chromium_config = builder.build().map_err(CrawlError::Configuration)?;
        info!(headless = config.headless, "launching chromium session");
        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| CrawlError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium handler reported error");
                }
            }
        });

        let page = browser
            .new_page(CreateTargetParams::new("about:blank"))
            .await?;

        Ok(Self {
            browser,
            page,
            handler_task: Some(handler_task),
        })
    }

    async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> CrawlResult<T> {
        let value = self
            .page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|err| CrawlError::Payload(format!("failed to decode payload: {err}")))?;
        Ok(value)
    }
}

#[async_trait(?Send)]
impl CrawlSession for BrowserSession {
    async fn goto(&mut self, url: &str) -> CrawlResult<()> {
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn idle(&mut self, range_ms: (u64, u64)) -> CrawlResult<()> {
        if range_ms.0 == 0 && range_ms.1 == 0 {
            return Ok(());
        }
        let lower = range_ms.0.min(range_ms.1);
        let upper = range_ms.0.max(range_ms.1);
        let millis = rand::thread_rng().gen_range(lower..=upper);
        sleep(Duration::from_millis(millis)).await;
        Ok(())
    }

    async fn scroll_by(&mut self, delta_y: f64) -> CrawlResult<()> {
        self.eval_json::<bool>(&scripts::scroll_by(delta_y)).await?;
        Ok(())
    }

    async fn element_count(&mut self, selector: &str) -> CrawlResult<usize> {
        self.eval_json(&scripts::count(selector)).await
    }

    async fn click_first(&mut self, selectors: &[String]) -> CrawlResult<bool> {
        self.eval_json(&scripts::click_first(selectors)).await
    }

    async fn click_link_by_text(&mut self, scope: &str, text: &str) -> CrawlResult<bool> {
        self.eval_json(&scripts::click_link_by_text(scope, text))
            .await
    }

    async fn click_containing(&mut self, scope: &str, needles: &[String]) -> CrawlResult<bool> {
        self.eval_json(&scripts::click_containing(scope, needles))
            .await
    }

    async fn pager_labels(&mut self, scope: &str) -> CrawlResult<Vec<String>> {
        self.eval_json(&scripts::pager_labels(scope)).await
    }

    async fn radio_checked(&mut self, selector: &str) -> CrawlResult<bool> {
        self.eval_json(&scripts::radio_checked(selector)).await
    }

    async fn force_check_radio(&mut self, selector: &str) -> CrawlResult<bool> {
        self.eval_json(&scripts::force_check_radio(selector)).await
    }

    async fn product_cards(&mut self, script: &str) -> CrawlResult<Vec<ProductCardRaw>> {
        self.eval_json(script).await
    }

    async fn review_entries(&mut self, script: &str) -> CrawlResult<Vec<ReviewEntryRaw>> {
        self.eval_json(script).await
    }

    async fn shutdown(&mut self) -> CrawlResult<()> {
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "browser handler join error");
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct BrowserSessionFactory {
    config: Arc<ChromiumSection>,
}

impl BrowserSessionFactory {
    pub fn new(config: ChromiumSection) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait(?Send)]
impl SessionFactory for BrowserSessionFactory {
    async fn create(&self) -> CrawlResult<Box<dyn CrawlSession>> {
        Ok(Box::new(BrowserSession::launch(&self.config).await?))
    }
}
