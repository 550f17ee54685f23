use tracing::{debug, warn};

use crate::config::{SelectorSection, WaitSection};
use crate::records::{GenderSegment, ReviewRecord};

use super::dedup::DeduplicationTracker;
use super::error::CrawlResult;
use super::extract::RecordExtractor;
use super::scripts;
use super::session::{wait_for_any, CrawlSession};

/// Walks the review pager for one gender segment, extracting records page
/// by page. The walk ends only when the list stops rendering or no page
/// control advances any further; every reachable page is read.
pub struct PaginationWalker<'a> {
    selectors: &'a SelectorSection,
    waits: &'a WaitSection,
    extractor: RecordExtractor,
}

impl<'a> PaginationWalker<'a> {
    pub fn new(selectors: &'a SelectorSection, waits: &'a WaitSection) -> Self {
        Self {
            selectors,
            waits,
            extractor: RecordExtractor::default(),
        }
    }

    pub async fn walk(
        &self,
        session: &mut dyn CrawlSession,
        segment: GenderSegment,
        dedup: &mut DeduplicationTracker,
    ) -> CrawlResult<Vec<ReviewRecord>> {
        let mut collected = Vec::new();
        let mut page = 1u32;
        let script = scripts::review_entries(&self.selectors.review_list);

        loop {
            let rendered = wait_for_any(
                session,
                std::slice::from_ref(&self.selectors.review_list),
                self.waits,
            )
            .await?;
            if !rendered {
                warn!(segment = %segment, page, "review list never rendered");
                break;
            }

            let entries = session.review_entries(&script).await?;
            if entries.is_empty() {
                debug!(segment = %segment, page, "empty review page");
                break;
            }

            let mut added = 0usize;
            for entry in &entries {
                let record = self.extractor.extract(entry, segment);
                if dedup.admit(&record) {
                    collected.push(record);
                    added += 1;
                }
            }
            debug!(segment = %segment, page, entries = entries.len(), added, "review page read");

            if !self.advance(session, page + 1).await? {
                break;
            }
            page += 1;
            session.idle(self.waits.page_settle_range()).await?;
        }

        Ok(collected)
    }

    async fn advance(&self, session: &mut dyn CrawlSession, next_page: u32) -> CrawlResult<bool> {
        let scope = &self.selectors.review_pager_scope;
        if session
            .click_link_by_text(scope, &next_page.to_string())
            .await?
        {
            return Ok(true);
        }
        session
            .click_containing(scope, &self.selectors.next_labels)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::crawler::session::{ProductCardRaw, ReviewEntryRaw};

    fn selectors() -> SelectorSection {
        SelectorSection {
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
        }
    }

    fn waits() -> WaitSection {
        WaitSection {
            condition_timeout_ms: 3,
            poll_interval_ms: 1,
            settle_ms: [0, 0],
            page_settle_ms: [0, 0],
            product_pause_ms: [0, 0],
        }
    }

    fn entry(customer: &str, body: &str, date: &str) -> ReviewEntryRaw {
        ReviewEntryRaw {
            customer_name: Some(customer.into()),
            tags: vec!["지성".into()],
            body: Some(body.into()),
            date: Some(date.into()),
            rating_text: Some("5점".into()),
        }
    }

    struct StubReviews {
        pages: Vec<Vec<ReviewEntryRaw>>,
        current: usize,
        clicked_pages: Vec<String>,
        next_clicks: usize,
    }

    impl StubReviews {
        fn new(pages: Vec<Vec<ReviewEntryRaw>>) -> Self {
            Self {
                pages,
                current: 0,
                clicked_pages: Vec::new(),
                next_clicks: 0,
            }
        }
    }

    #[async_trait(?Send)]
    impl CrawlSession for StubReviews {
        async fn goto(&mut self, _url: &str) -> CrawlResult<()> {
            Ok(())
        }

        async fn idle(&mut self, _range_ms: (u64, u64)) -> CrawlResult<()> {
            Ok(())
        }

        async fn scroll_by(&mut self, _delta_y: f64) -> CrawlResult<()> {
            Ok(())
        }

        async fn element_count(&mut self, _selector: &str) -> CrawlResult<usize> {
            Ok(usize::from(self.current < self.pages.len()))
        }

        async fn click_first(&mut self, _selectors: &[String]) -> CrawlResult<bool> {
            Ok(false)
        }

        async fn click_link_by_text(&mut self, _scope: &str, text: &str) -> CrawlResult<bool> {
            if self.current + 1 < self.pages.len() {
                self.clicked_pages.push(text.to_string());
                self.current += 1;
                return Ok(true);
            }
            Ok(false)
        }

        async fn click_containing(
            &mut self,
            _scope: &str,
            _needles: &[String],
        ) -> CrawlResult<bool> {
            self.next_clicks += 1;
            Ok(false)
        }

        async fn pager_labels(&mut self, _scope: &str) -> CrawlResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn radio_checked(&mut self, _selector: &str) -> CrawlResult<bool> {
            Ok(false)
        }

        async fn force_check_radio(&mut self, _selector: &str) -> CrawlResult<bool> {
            Ok(false)
        }

        async fn product_cards(&mut self, _script: &str) -> CrawlResult<Vec<ProductCardRaw>> {
            Ok(Vec::new())
        }

        async fn review_entries(&mut self, _script: &str) -> CrawlResult<Vec<ReviewEntryRaw>> {
            Ok(self.pages.get(self.current).cloned().unwrap_or_default())
        }

        async fn shutdown(&mut self) -> CrawlResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn walks_all_pages_and_stops_at_pager_end() {
        let selectors = selectors();
        let waits = waits();
        let walker = PaginationWalker::new(&selectors, &waits);
        let mut session = StubReviews::new(vec![
            vec![entry("a", "good", "2026.01.01"), entry("b", "fine", "2026.01.02")],
            vec![entry("c", "great", "2026.01.03")],
        ]);
        let mut dedup = DeduplicationTracker::default();

        let records = walker
            .walk(&mut session, GenderSegment::Female, &mut dedup)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(session.clicked_pages, vec!["2"]);
        // The fallback next-label control was probed once after page 2.
        assert_eq!(session.next_clicks, 1);
    }

    #[tokio::test]
    async fn duplicate_page_does_not_cut_the_walk_short() {
        let selectors = selectors();
        let waits = waits();
        let walker = PaginationWalker::new(&selectors, &waits);
        let repeated = vec![entry("a", "good", "2026.01.01")];
        let mut session = StubReviews::new(vec![
            repeated.clone(),
            repeated,
            vec![entry("b", "late page", "2026.01.09")],
        ]);
        let mut dedup = DeduplicationTracker::default();

        let records = walker
            .walk(&mut session, GenderSegment::Female, &mut dedup)
            .await
            .unwrap();
        // The mid-stream repeat contributes nothing, but the page after it
        // is still reached and its record kept.
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].review_text, "late page");
        assert_eq!(session.clicked_pages, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn long_pagers_are_walked_to_the_end() {
        let selectors = selectors();
        let waits = waits();
        let walker = PaginationWalker::new(&selectors, &waits);
        let pages: Vec<Vec<ReviewEntryRaw>> = (0..40)
            .map(|n| vec![entry(&format!("user{n}"), &format!("review {n}"), "2026.01.01")])
            .collect();
        let mut session = StubReviews::new(pages);
        let mut dedup = DeduplicationTracker::default();

        let records = walker
            .walk(&mut session, GenderSegment::Female, &mut dedup)
            .await
            .unwrap();
        assert_eq!(records.len(), 40);
        assert_eq!(session.clicked_pages.last().map(String::as_str), Some("40"));
    }

    #[tokio::test]
    async fn shared_tracker_suppresses_cross_segment_duplicates() {
        let selectors = selectors();
        let waits = waits();
        let walker = PaginationWalker::new(&selectors, &waits);
        let mut dedup = DeduplicationTracker::default();

        let mut first = StubReviews::new(vec![vec![entry("a", "good", "2026.01.01")]]);
        let records = walker
            .walk(&mut first, GenderSegment::Female, &mut dedup)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        // Same signature under the other segment is a distinct record.
        let mut second = StubReviews::new(vec![vec![entry("a", "good", "2026.01.01")]]);
        let records = walker
            .walk(&mut second, GenderSegment::Male, &mut dedup)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
