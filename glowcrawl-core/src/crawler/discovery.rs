use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::{CrawlerConfig, SearchSection, SelectorSection, WaitSection};
use crate::records::{Product, MISSING_FIELD};

use super::error::CrawlResult;
use super::scripts;
use super::session::{wait_for_any, CrawlSession, ProductCardRaw};

/// Finds the product set for the configured keyword. The offset-indexed
/// primary strategy is cheap but the listing sometimes refuses to page by
/// `startCount`; when it yields no more than one page's worth of items the
/// click-driven pager walk runs and its snapshot supersedes the primary's
/// (the two strategies can observe different sort orders, so merging would
/// produce an inconsistent set).
pub struct ListingDiscoverer<'a> {
    search: &'a SearchSection,
    selectors: &'a SelectorSection,
    waits: &'a WaitSection,
}

#[derive(Default)]
struct UniqueProducts {
    seen: HashSet<(String, String)>,
    items: Vec<Product>,
}

impl UniqueProducts {
    fn extend(&mut self, products: Vec<Product>) -> usize {
        let mut added = 0;
        for product in products {
            let key = (product.name.clone(), product.link.clone());
            if self.seen.insert(key) {
                self.items.push(product);
                added += 1;
            }
        }
        added
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn into_vec(self) -> Vec<Product> {
        self.items
    }
}

impl<'a> ListingDiscoverer<'a> {
    pub fn new(config: &'a CrawlerConfig) -> Self {
        Self {
            search: &config.search,
            selectors: &config.selectors,
            waits: &config.waits,
        }
    }

    pub async fn discover(&self, session: &mut dyn CrawlSession) -> CrawlResult<Vec<Product>> {
        let primary = self.offset_walk(session).await?;
        if primary.len() > self.search.items_per_page as usize {
            info!(
                products = primary.len(),
                strategy = "offset",
                "product discovery complete"
            );
            return Ok(primary);
        }

        info!(
            products = primary.len(),
            "primary strategy yielded at most one page; walking the pager"
        );
        let fallback = self.pager_walk(session).await?;
        info!(
            products = fallback.len(),
            strategy = "pager",
            "product discovery complete"
        );
        Ok(fallback)
    }

    pub fn listing_url(&self, start_count: u32) -> String {
        let query: String =
            url::form_urlencoded::byte_serialize(self.search.keyword.as_bytes()).collect();
        format!(
            "https://www.oliveyoung.co.kr/store/search/getSearchMain.do?\
             startCount={start_count}\
             &sort=RANK%2FDESC&goods_sort=WEIGHT%2FDESC%2CRANK%2FDESC\
             &collection=ALL&reQuery=\
             &viewtype=image&category=&catename=LCTG_ID&catedepth=1&rt=\
             &listnum={listnum}&tmp_requery=&tmp_requery2=\
             &categoryDepthValue=2&cateId=10000010001&cateId2=100000100010015\
             &BenefitAll_CHECK=\
             &query={query}&realQuery={query}\
             &selectCateNm=%ED%81%AC%EB%A6%BC+%EC%B9%B4%ED%85%8C%EA%B3%A0%EB%A6%AC%EC%97%90\
             &typeChk=thum",
            listnum = self.search.items_per_page,
        )
    }

    async fn offset_walk(&self, session: &mut dyn CrawlSession) -> CrawlResult<Vec<Product>> {
        let mut unique = UniqueProducts::default();
        for index in 0..self.search.max_offset_pages {
            let start_count = index * self.search.items_per_page;
            if let Err(err) = session.goto(&self.listing_url(start_count)).await {
                if err.is_session_fatal() {
                    return Err(err);
                }
                warn!(start_count, error = %err, "failed to open listing page");
                continue;
            }
            if !wait_for_any(session, &self.selectors.list_containers, self.waits).await? {
                warn!(start_count, "listing did not render in time");
                continue;
            }
            let added = unique.extend(self.collect_cards(session).await?);
            debug!(
                start_count,
                added,
                total = unique.len(),
                "offset page collected"
            );
            if added == 0 && index > 0 {
                break;
            }
        }
        Ok(unique.into_vec())
    }

    async fn pager_walk(&self, session: &mut dyn CrawlSession) -> CrawlResult<Vec<Product>> {
        let mut unique = UniqueProducts::default();
        if let Err(err) = session.goto(&self.listing_url(0)).await {
            if err.is_session_fatal() {
                return Err(err);
            }
            warn!(error = %err, "failed to open first listing page");
            return Ok(unique.into_vec());
        }
        if !wait_for_any(session, &self.selectors.list_containers, self.waits).await? {
            warn!("first listing page did not render in time");
            return Ok(unique.into_vec());
        }
        unique.extend(self.collect_cards(session).await?);

        let scope = &self.selectors.listing_pager_scope;
        let mut visited_numbers: HashSet<u32> = HashSet::new();
        let mut clicks = 0u32;
        while clicks < self.search.max_pager_clicks {
            let mut advanced = session
                .click_containing(scope, &self.selectors.next_labels)
                .await?;
            if !advanced {
                // No explicit "next": take the highest-numbered control we
                // have not clicked yet.
                let labels = session.pager_labels(scope).await?;
                let candidate = labels
                    .iter()
                    .filter_map(|label| label.trim().parse::<u32>().ok())
                    .filter(|number| !visited_numbers.contains(number))
                    .max();
                if let Some(number) = candidate {
                    if session
                        .click_link_by_text(scope, &number.to_string())
                        .await?
                    {
                        visited_numbers.insert(number);
                        advanced = true;
                    }
                }
            }
            if !advanced {
                break;
            }

            clicks += 1;
            session.idle(self.waits.page_settle_range()).await?;
            if !wait_for_any(session, &self.selectors.list_containers, self.waits).await? {
                break;
            }
            let added = unique.extend(self.collect_cards(session).await?);
            debug!(clicks, added, total = unique.len(), "pager page collected");
            if added == 0 {
                break;
            }
        }
        Ok(unique.into_vec())
    }

    async fn collect_cards(&self, session: &mut dyn CrawlSession) -> CrawlResult<Vec<Product>> {
        let script = scripts::product_cards(&self.selectors.product_cards);
        let cards = session.product_cards(&script).await?;
        Ok(cards.into_iter().filter_map(into_product).collect())
    }
}

fn into_product(card: ProductCardRaw) -> Option<Product> {
    // Cards without a link cannot be crawled and are dropped outright.
    let link = card.link.filter(|l| !l.is_empty())?;
    Some(Product {
        name: card.name.unwrap_or_else(|| MISSING_FIELD.to_string()),
        brand: card.brand.unwrap_or_else(|| MISSING_FIELD.to_string()),
        link,
    })
}
