use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use glowcrawl_core::config::{
    ChromiumSection, CrawlerConfig, ObservabilitySection, OutputSection, SearchSection,
    SelectorSection, WaitSection,
};
use glowcrawl_core::crawler::{
    CrawlError, CrawlOrchestrator, CrawlResult, CrawlSession, ProductCardRaw, ReviewEntryRaw,
    SessionFactory,
};
use glowcrawl_core::records::{GenderSegment, Product, ReviewRecord};
use glowcrawl_core::sink::{PersistenceSink, SinkResult};

fn test_config(output_dir: &Path) -> CrawlerConfig {
    CrawlerConfig {
        chromium: ChromiumSection {
            executable_path: None,
            headless: true,
            sandbox: false,
            disable_gpu: true,
            lang: "ko-KR".into(),
            user_agent: "test".into(),
            request_timeout_seconds: None,
        },
        search: SearchSection {
            keyword: "여드름".into(),
            items_per_page: 1,
            max_offset_pages: 1,
            max_pager_clicks: 10,
            start_at: 0,
            max_products: None,
        },
        selectors: SelectorSection {
            list_containers: vec!["ul.cate_prd_list li".into()],
            product_cards: vec!["ul.cate_prd_list li".into()],
            listing_pager_scope: "div.pageing".into(),
            review_tab: vec!["#reviewInfo > a".into()],
            review_list: "#gdasList".into(),
            review_pager_scope: "#gdasContentsArea div.pageing".into(),
            filter_toggle: vec!["#filterBtn".into()],
            filter_toggle_text: "리뷰 검색 필터".into(),
            filter_panel: "#filterDiv".into(),
            apply_buttons: vec!["#filterDiv .btnArea .btnGreen".into()],
            apply_button_text: vec!["적용".into()],
            next_labels: vec!["다음".into(), "next".into()],
        },
        waits: WaitSection {
            condition_timeout_ms: 3,
            poll_interval_ms: 1,
            settle_ms: [0, 0],
            page_settle_ms: [0, 0],
            product_pause_ms: [0, 0],
        },
        output: OutputSection {
            directory: output_dir.to_string_lossy().into_owned(),
            product_list_file: "products.csv".into(),
            reviews_file: "reviews.csv".into(),
        },
        observability: ObservabilitySection {
            failure_log: "failures.jsonl".into(),
        },
    }
}

fn card(name: &str, link: &str) -> ProductCardRaw {
    ProductCardRaw {
        name: Some(name.into()),
        brand: Some("글로우랩".into()),
        link: Some(link.into()),
    }
}

fn entry(customer: &str, tags: &[&str], body: &str, date: &str, rating: &str) -> ReviewEntryRaw {
    ReviewEntryRaw {
        customer_name: Some(customer.into()),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        body: Some(body.into()),
        date: Some(date.into()),
        rating_text: Some(rating.into()),
    }
}

#[derive(Default)]
struct ProductPage {
    female: Vec<ReviewEntryRaw>,
    male: Vec<ReviewEntryRaw>,
}

/// Shared scripted site; every session created by the factory observes the
/// same state, which is what lets fault tests count sessions.
#[derive(Default)]
struct SiteState {
    listing: Vec<ProductCardRaw>,
    products: HashMap<String, ProductPage>,
    fatal_goto_faults: HashMap<String, u32>,
    broken_products: HashSet<String>,
    sessions_created: u32,
}

struct ScriptedSession {
    site: Arc<Mutex<SiteState>>,
    on_listing: bool,
    product: Option<String>,
    checked: Option<GenderSegment>,
    applied: Option<GenderSegment>,
}

fn segment_for(selector: &str) -> Option<GenderSegment> {
    if selector.contains("sati_type5_1") || selector.contains("value='F'") {
        Some(GenderSegment::Female)
    } else if selector.contains("sati_type5_2") || selector.contains("value='M'") {
        Some(GenderSegment::Male)
    } else {
        None
    }
}

#[async_trait(?Send)]
impl CrawlSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> CrawlResult<()> {
        if url.contains("getSearchMain.do") {
            self.on_listing = true;
            self.product = None;
            return Ok(());
        }
        let mut site = self.site.lock().unwrap();
        if let Some(remaining) = site.fatal_goto_faults.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CrawlError::SessionDead("tab crashed".into()));
            }
        }
        if site.broken_products.contains(url) {
            return Err(CrawlError::Timeout(format!("navigation to {url}")));
        }
        self.on_listing = false;
        self.product = Some(url.to_string());
        self.checked = None;
        self.applied = None;
        Ok(())
    }

    async fn idle(&mut self, _range_ms: (u64, u64)) -> CrawlResult<()> {
        Ok(())
    }

    async fn scroll_by(&mut self, _delta_y: f64) -> CrawlResult<()> {
        Ok(())
    }

    async fn element_count(&mut self, selector: &str) -> CrawlResult<usize> {
        if self.on_listing && selector.contains("cate_prd_list") {
            return Ok(self.site.lock().unwrap().listing.len());
        }
        if self.product.is_some() && selector == "#gdasList" {
            return Ok(1);
        }
        Ok(0)
    }

    async fn click_first(&mut self, selectors: &[String]) -> CrawlResult<bool> {
        if selectors.iter().any(|s| s.contains("reviewInfo")) {
            return Ok(self.product.is_some());
        }
        if selectors.iter().any(|s| s.contains("filterBtn")) {
            return Ok(true);
        }
        if let Some(segment) = selectors.iter().find_map(|s| segment_for(s)) {
            self.checked = Some(segment);
            return Ok(true);
        }
        if selectors.iter().any(|s| s.contains("btnGreen")) {
            self.applied = self.checked;
            return Ok(true);
        }
        Ok(false)
    }

    async fn click_link_by_text(&mut self, _scope: &str, text: &str) -> CrawlResult<bool> {
        Ok(text == "1")
    }

    async fn click_containing(&mut self, _scope: &str, _needles: &[String]) -> CrawlResult<bool> {
        Ok(false)
    }

    async fn pager_labels(&mut self, _scope: &str) -> CrawlResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn radio_checked(&mut self, selector: &str) -> CrawlResult<bool> {
        Ok(self.checked.is_some() && self.checked == segment_for(selector))
    }

    async fn force_check_radio(&mut self, selector: &str) -> CrawlResult<bool> {
        self.checked = segment_for(selector);
        Ok(true)
    }

    async fn product_cards(&mut self, _script: &str) -> CrawlResult<Vec<ProductCardRaw>> {
        if self.on_listing {
            return Ok(self.site.lock().unwrap().listing.clone());
        }
        Ok(Vec::new())
    }

    async fn review_entries(&mut self, _script: &str) -> CrawlResult<Vec<ReviewEntryRaw>> {
        let (Some(link), Some(segment)) = (&self.product, self.applied) else {
            return Ok(Vec::new());
        };
        let site = self.site.lock().unwrap();
        let Some(page) = site.products.get(link) else {
            return Ok(Vec::new());
        };
        Ok(match segment {
            GenderSegment::Female => page.female.clone(),
            GenderSegment::Male => page.male.clone(),
        })
    }

    async fn shutdown(&mut self) -> CrawlResult<()> {
        Ok(())
    }
}

struct ScriptedFactory {
    site: Arc<Mutex<SiteState>>,
}

#[async_trait(?Send)]
impl SessionFactory for ScriptedFactory {
    async fn create(&self) -> CrawlResult<Box<dyn CrawlSession>> {
        self.site.lock().unwrap().sessions_created += 1;
        Ok(Box::new(ScriptedSession {
            site: self.site.clone(),
            on_listing: false,
            product: None,
            checked: None,
            applied: None,
        }))
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    product_list: Arc<Mutex<Vec<Product>>>,
    appends: Arc<Mutex<Vec<(String, Vec<ReviewRecord>)>>>,
}

impl PersistenceSink for RecordingSink {
    fn write_product_list(&mut self, products: &[Product]) -> SinkResult<()> {
        self.product_list.lock().unwrap().extend_from_slice(products);
        Ok(())
    }

    fn append_reviews(&mut self, product: &Product, records: &[ReviewRecord]) -> SinkResult<()> {
        self.appends
            .lock()
            .unwrap()
            .push((product.name.clone(), records.to_vec()));
        Ok(())
    }
}

const LINK_A: &str = "https://example.com/goods/1";
const LINK_B: &str = "https://example.com/goods/2";

fn seeded_site() -> SiteState {
    let mut products = HashMap::new();
    products.insert(
        LINK_A.to_string(),
        ProductPage {
            female: vec![
                entry("하늘", &["지성", "트러블"], "진정에 좋아요", "2026.08.01", "5점"),
                entry("바다", &["건성", "봄원톤"], "순해요", "2026.08.02", "4점"),
                entry("구름", &["복합성"], "재구매 의사 있음", "2026.08.03", "5점 만점에 4점"),
                // exact repeat of the first entry, must be dropped
                entry("하늘", &["지성", "트러블"], "진정에 좋아요", "2026.08.01", "5점"),
            ],
            male: vec![
                entry("산", &["지성", "모공"], "가볍게 발려요", "2026.08.04", "4점"),
                entry("강", &[], "무난합니다", "2026.08.05", "별점 없음"),
            ],
        },
    );
    products.insert(
        LINK_B.to_string(),
        ProductPage {
            female: vec![entry("눈", &["민감성"], "자극이 없어요", "2026.08.06", "5점")],
            male: Vec::new(),
        },
    );
    SiteState {
        listing: vec![card("수분 진정 크림", LINK_A), card("시카 카밍 크림", LINK_B)],
        products,
        ..SiteState::default()
    }
}

fn orchestrator(
    site: SiteState,
    output_dir: &Path,
) -> (CrawlOrchestrator<RecordingSink>, Arc<Mutex<SiteState>>, RecordingSink) {
    let site = Arc::new(Mutex::new(site));
    let sink = RecordingSink::default();
    let factory = ScriptedFactory { site: site.clone() };
    let orchestrator = CrawlOrchestrator::new(test_config(output_dir), Box::new(factory), sink.clone());
    (orchestrator, site, sink)
}

#[tokio::test]
async fn full_crawl_collects_segmented_deduplicated_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let (mut orchestrator, site, sink) = orchestrator(seeded_site(), dir.path());

    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.products_discovered, 2);
    assert_eq!(stats.products_processed, 2);
    assert_eq!(stats.products_failed, 0);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.reviews_collected, 6);
    assert_eq!(site.lock().unwrap().sessions_created, 1);

    let product_list = sink.product_list.lock().unwrap();
    assert_eq!(product_list.len(), 2);
    assert_eq!(product_list[0].name, "수분 진정 크림");
    assert_eq!(product_list[0].link, LINK_A);

    let appends = sink.appends.lock().unwrap();
    assert_eq!(appends.len(), 2);
    let (name, records) = &appends[0];
    assert_eq!(name, "수분 진정 크림");
    assert_eq!(records.len(), 5);

    // segments in order, duplicate female entry suppressed
    let female: Vec<&ReviewRecord> = records
        .iter()
        .filter(|r| r.gender_segment == "여성")
        .collect();
    assert_eq!(female.len(), 3);
    assert_eq!(female[0].customer_name, "하늘");
    assert_eq!(female[0].skin_type, "지성");
    assert_eq!(female[0].skin_concerns, "트러블");
    assert_eq!(female[0].rating, Some(5.0));
    // alias-resolved tone
    assert_eq!(female[1].skin_tone, "봄웜톤");
    // last numeric token wins
    assert_eq!(female[2].rating, Some(4.0));

    let male: Vec<&ReviewRecord> = records
        .iter()
        .filter(|r| r.gender_segment == "남성")
        .collect();
    assert_eq!(male.len(), 2);
    assert_eq!(male[1].rating, None);
    assert_eq!(male[1].skin_type, "");

    let (name, records) = &appends[1];
    assert_eq!(name, "시카 카밍 크림");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].skin_type, "민감성");
    assert_eq!(records[0].skin_concerns, "");
}

#[tokio::test]
async fn session_fault_relaunches_and_reviews_are_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = seeded_site();
    state.fatal_goto_faults.insert(LINK_A.to_string(), 1);
    let (mut orchestrator, site, sink) = orchestrator(state, dir.path());

    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.products_processed, 2);
    assert_eq!(stats.products_failed, 0);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.reviews_collected, 6);
    assert_eq!(site.lock().unwrap().sessions_created, 2);
    assert_eq!(orchestrator.sessions_created(), 2);

    // the retried product's reviews appear exactly once
    let appends = sink.appends.lock().unwrap();
    let for_a: Vec<_> = appends.iter().filter(|(name, _)| name == "수분 진정 크림").collect();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_a[0].1.len(), 5);
}

#[tokio::test]
async fn broken_product_is_skipped_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = seeded_site();
    state.broken_products.insert(LINK_B.to_string());
    let (mut orchestrator, site, sink) = orchestrator(state, dir.path());

    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.products_processed, 1);
    assert_eq!(stats.products_failed, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.reviews_collected, 5);
    // non-fatal navigation error keeps the session alive
    assert_eq!(site.lock().unwrap().sessions_created, 1);

    let appends = sink.appends.lock().unwrap();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].0, "수분 진정 크림");

    let log = std::fs::read_to_string(dir.path().join("failures.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry["unit"], "시카 카밍 크림");
    assert_eq!(entry["action"], "skipped");
    assert_eq!(entry["attempts"], 1);
}

#[tokio::test]
async fn product_range_limits_the_crawl() {
    let dir = tempfile::tempdir().unwrap();
    let site = Arc::new(Mutex::new(seeded_site()));
    let sink = RecordingSink::default();
    let factory = ScriptedFactory { site: site.clone() };
    let mut config = test_config(dir.path());
    config.search.start_at = 1;
    config.search.max_products = Some(1);
    let mut orchestrator = CrawlOrchestrator::new(config, Box::new(factory), sink.clone());

    let stats = orchestrator.run().await.unwrap();

    assert_eq!(stats.products_discovered, 2);
    assert_eq!(stats.products_processed, 1);
    assert_eq!(stats.reviews_collected, 1);
    let appends = sink.appends.lock().unwrap();
    assert_eq!(appends[0].0, "시카 카밍 크림");
}
