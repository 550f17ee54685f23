use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CrawlerConfig {
    pub chromium: ChromiumSection,
    pub search: SearchSection,
    pub selectors: SelectorSection,
    pub waits: WaitSection,
    pub output: OutputSection,
    pub observability: ObservabilitySection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromiumSection {
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub lang: String,
    pub user_agent: String,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    pub keyword: String,
    pub items_per_page: u32,
    /// How many offset-indexed listing pages the primary strategy probes
    /// before the pager fallback is considered.
    pub max_offset_pages: u32,
    pub max_pager_clicks: u32,
    pub start_at: usize,
    pub max_products: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorSection {
    pub list_containers: Vec<String>,
    pub product_cards: Vec<String>,
    pub listing_pager_scope: String,
    pub review_tab: Vec<String>,
    pub review_list: String,
    pub review_pager_scope: String,
    pub filter_toggle: Vec<String>,
    pub filter_toggle_text: String,
    pub filter_panel: String,
    pub apply_buttons: Vec<String>,
    pub apply_button_text: Vec<String>,
    pub next_labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitSection {
    pub condition_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_ms: [u64; 2],
    pub page_settle_ms: [u64; 2],
    pub product_pause_ms: [u64; 2],
}

impl WaitSection {
    pub fn settle_range(&self) -> (u64, u64) {
        (self.settle_ms[0], self.settle_ms[1])
    }

    pub fn page_settle_range(&self) -> (u64, u64) {
        (self.page_settle_ms[0], self.page_settle_ms[1])
    }

    pub fn product_pause_range(&self) -> (u64, u64) {
        (self.product_pause_ms[0], self.product_pause_ms[1])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    pub directory: String,
    pub product_list_file: String,
    pub reviews_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilitySection {
    pub failure_log: String,
}

pub fn load_crawler_config<P: AsRef<Path>>(path: P) -> Result<CrawlerConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
