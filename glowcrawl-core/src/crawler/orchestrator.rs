use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{CrawlerConfig, ObservabilitySection, OutputSection, SearchSection};
use crate::records::{GenderSegment, Product, ReviewRecord};
use crate::sink::PersistenceSink;

use super::dedup::DeduplicationTracker;
use super::discovery::ListingDiscoverer;
use super::error::{CrawlError, CrawlResult};
use super::filter::{FilterController, FilterState};
use super::pagination::PaginationWalker;
use super::recovery::{FaultRecoveryCoordinator, UnitOutcome};
use super::session::{CrawlSession, SessionFactory};

#[derive(Debug, Serialize)]
pub struct CrawlStats {
    pub keyword: String,
    pub products_discovered: usize,
    pub products_processed: usize,
    pub products_failed: usize,
    pub reviews_collected: usize,
    pub errors: usize,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
pub struct FailureEntry {
    pub timestamp: DateTime<Utc>,
    pub unit: String,
    pub stage: String,
    pub error: String,
    pub attempts: u32,
    pub action: String,
}

impl FailureEntry {
    fn new(unit: &str, stage: &str, error: &CrawlError, attempts: u32, action: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            unit: unit.to_string(),
            stage: stage.to_string(),
            error: error.to_string(),
            attempts,
            action: action.to_string(),
        }
    }
}

/// Append-only JSONL log of unit failures. Logging must never take the
/// crawl down, so write errors are demoted to warnings.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(output: &OutputSection, observability: &ObservabilitySection) -> Self {
        Self {
            path: Path::new(&output.directory).join(&observability.failure_log),
        }
    }

    pub fn record(&self, entry: &FailureEntry) {
        if let Err(error) = self.append(entry) {
            warn!(%error, "failure log write failed");
        }
    }

    fn append(&self, entry: &FailureEntry) -> CrawlResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line =
            serde_json::to_string(entry).map_err(|error| CrawlError::Payload(error.to_string()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Drives a full crawl: listing discovery, then a per-product review unit
/// for each selected product. Every unit runs through the recovery layer;
/// a failed product is logged and skipped, never fatal to the run.
pub struct CrawlOrchestrator<S: PersistenceSink> {
    config: CrawlerConfig,
    recovery: FaultRecoveryCoordinator,
    sink: S,
    failure_log: FailureLog,
}

impl<S: PersistenceSink> CrawlOrchestrator<S> {
    pub fn new(config: CrawlerConfig, factory: Box<dyn SessionFactory>, sink: S) -> Self {
        let failure_log = FailureLog::new(&config.output, &config.observability);
        Self {
            config,
            recovery: FaultRecoveryCoordinator::new(factory),
            sink,
            failure_log,
        }
    }

    pub fn sessions_created(&self) -> u32 {
        self.recovery.sessions_created()
    }

    pub async fn run(&mut self) -> CrawlResult<CrawlStats> {
        let result = self.run_inner().await;
        self.recovery.release().await;
        result
    }

    /// Discovery only: writes the product list and returns it without
    /// visiting any product page.
    pub async fn discover_products(&mut self) -> CrawlResult<Vec<Product>> {
        let result = self.discover().await;
        self.recovery.release().await;
        let products = result?;
        self.sink.write_product_list(&products)?;
        Ok(products)
    }

    async fn run_inner(&mut self) -> CrawlResult<CrawlStats> {
        let started = Instant::now();
        info!(keyword = %self.config.search.keyword, "crawl started");

        let products = self.discover().await?;
        self.sink.write_product_list(&products)?;

        let mut stats = CrawlStats {
            keyword: self.config.search.keyword.clone(),
            products_discovered: products.len(),
            products_processed: 0,
            products_failed: 0,
            reviews_collected: 0,
            errors: 0,
            duration_secs: 0.0,
        };

        let selected = select_range(&self.config.search, products);
        for product in &selected {
            let config = &self.config;
            let recovery = &mut self.recovery;
            let outcome = recovery
                .run_unit(&product.name, |session| {
                    crawl_product(config, session, product)
                })
                .await?;
            match outcome {
                UnitOutcome::Completed { value, attempts } => {
                    if attempts > 1 {
                        stats.errors += 1;
                    }
                    stats.products_processed += 1;
                    stats.reviews_collected += value.len();
                    self.sink.append_reviews(product, &value)?;
                    info!(product = %product.name, reviews = value.len(), "product done");
                }
                UnitOutcome::Failed { error, attempts } => {
                    warn!(product = %product.name, %error, attempts, "product crawl failed");
                    stats.products_failed += 1;
                    stats.errors += 1;
                    self.failure_log.record(&FailureEntry::new(
                        &product.name,
                        "reviews",
                        &error,
                        attempts,
                        "skipped",
                    ));
                }
            }
        }

        stats.duration_secs = started.elapsed().as_secs_f64();
        info!(
            processed = stats.products_processed,
            failed = stats.products_failed,
            reviews = stats.reviews_collected,
            "crawl finished"
        );
        Ok(stats)
    }

    async fn discover(&mut self) -> CrawlResult<Vec<Product>> {
        let config = &self.config;
        let recovery = &mut self.recovery;
        let outcome = recovery
            .run_unit("discovery", |session| discover_listing(config, session))
            .await?;
        match outcome {
            UnitOutcome::Completed { value, .. } => Ok(value),
            UnitOutcome::Failed { error, attempts } => {
                self.failure_log.record(&FailureEntry::new(
                    "discovery",
                    "listing",
                    &error,
                    attempts,
                    "aborted",
                ));
                Err(error)
            }
        }
    }
}

fn select_range(search: &SearchSection, mut products: Vec<Product>) -> Vec<Product> {
    let start = search.start_at.min(products.len());
    let mut tail = products.split_off(start);
    if let Some(max) = search.max_products {
        tail.truncate(max);
    }
    tail
}

async fn discover_listing(
    config: &CrawlerConfig,
    mut session: Box<dyn CrawlSession>,
) -> (Box<dyn CrawlSession>, CrawlResult<Vec<Product>>) {
    let discoverer = ListingDiscoverer::new(config);
    let result = discoverer.discover(session.as_mut()).await;
    (session, result)
}

async fn crawl_product(
    config: &CrawlerConfig,
    mut session: Box<dyn CrawlSession>,
    product: &Product,
) -> (Box<dyn CrawlSession>, CrawlResult<Vec<ReviewRecord>>) {
    let result = collect_product_reviews(config, session.as_mut(), product).await;
    (session, result)
}

async fn collect_product_reviews(
    config: &CrawlerConfig,
    session: &mut dyn CrawlSession,
    product: &Product,
) -> CrawlResult<Vec<ReviewRecord>> {
    session.goto(&product.link).await?;
    session.idle(config.waits.page_settle_range()).await?;

    if !session.click_first(&config.selectors.review_tab).await? {
        return Err(CrawlError::ElementNotFound(
            config.selectors.review_tab.join(", "),
        ));
    }
    session.idle(config.waits.settle_range()).await?;

    let walker = PaginationWalker::new(&config.selectors, &config.waits);
    let mut dedup = DeduplicationTracker::default();
    let mut records = Vec::new();
    for segment in GenderSegment::ALL {
        let mut filter = FilterController::new(&config.selectors, &config.waits);
        if filter.apply(session, segment).await? != FilterState::Applied {
            warn!(product = %product.name, segment = %segment, "segment filter not applied, skipping");
            continue;
        }
        let mut segment_records = walker.walk(session, segment, &mut dedup).await?;
        info!(
            product = %product.name,
            segment = %segment,
            records = segment_records.len(),
            "segment collected"
        );
        records.append(&mut segment_records);
    }

    session.idle(config.waits.product_pause_range()).await?;
    Ok(records)
}
