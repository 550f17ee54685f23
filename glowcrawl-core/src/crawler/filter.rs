use tracing::{debug, warn};

use crate::config::{SelectorSection, WaitSection};
use crate::records::GenderSegment;

use super::error::CrawlResult;
use super::session::{wait_for_any, CrawlSession};

/// Filter application progresses through a fixed state sequence; `Failed`
/// is absorbing and reachable from every step on timeout or no-match. The
/// caller skips the segment's data instead of aborting the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Closed,
    PanelOpen,
    ValueSelected,
    Applying,
    Applied,
    Failed,
}

pub struct FilterController<'a> {
    selectors: &'a SelectorSection,
    waits: &'a WaitSection,
    state: FilterState,
}

impl<'a> FilterController<'a> {
    pub fn new(selectors: &'a SelectorSection, waits: &'a WaitSection) -> Self {
        Self {
            selectors,
            waits,
            state: FilterState::Closed,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub async fn apply(
        &mut self,
        session: &mut dyn CrawlSession,
        segment: GenderSegment,
    ) -> CrawlResult<FilterState> {
        self.state = FilterState::Closed;

        if !self.open_panel(session).await? {
            return Ok(self.fail(segment, "panel toggle"));
        }
        self.state = FilterState::PanelOpen;
        session.idle(self.waits.settle_range()).await?;

        if !self.select_value(session, segment).await? {
            return Ok(self.fail(segment, "segment selector"));
        }
        self.state = FilterState::ValueSelected;

        if !self.commit(session).await? {
            return Ok(self.fail(segment, "commit control"));
        }
        self.state = FilterState::Applying;

        let confirmed = wait_for_any(
            session,
            std::slice::from_ref(&self.selectors.review_list),
            self.waits,
        )
        .await?;
        if !confirmed {
            return Ok(self.fail(segment, "review list after apply"));
        }
        self.state = FilterState::Applied;
        debug!(segment = %segment, "filter applied");

        session.idle(self.waits.settle_range()).await?;
        self.reset_to_first_page(session).await?;
        Ok(self.state)
    }

    fn fail(&mut self, segment: GenderSegment, stage: &str) -> FilterState {
        warn!(segment = %segment, stage, "filter application failed");
        self.state = FilterState::Failed;
        self.state
    }

    async fn open_panel(&self, session: &mut dyn CrawlSession) -> CrawlResult<bool> {
        if session.click_first(&self.selectors.filter_toggle).await? {
            return Ok(true);
        }
        session
            .click_containing("body", &[self.selectors.filter_toggle_text.clone()])
            .await
    }

    async fn select_value(
        &self,
        session: &mut dyn CrawlSession,
        segment: GenderSegment,
    ) -> CrawlResult<bool> {
        let panel = &self.selectors.filter_panel;
        let label_selector = format!("{panel} label[for='{}']", segment.input_id());
        let input_selector = format!(
            "{panel} input[name='sati_type5'][value='{}']",
            segment.code()
        );

        let clicked = session
            .click_first(&[label_selector, input_selector.clone()])
            .await?
            || session
                .click_containing(panel, &[segment.label().to_string()])
                .await?;
        if !clicked {
            return Ok(false);
        }
        session.idle(self.waits.settle_range()).await?;

        if !session.radio_checked(&input_selector).await? {
            // The click was swallowed somewhere between the label and the
            // input; force the state and synthesize the change event.
            session.force_check_radio(&input_selector).await?;
        }
        Ok(true)
    }

    async fn commit(&self, session: &mut dyn CrawlSession) -> CrawlResult<bool> {
        if session.click_first(&self.selectors.apply_buttons).await? {
            return Ok(true);
        }
        session
            .click_containing(&self.selectors.filter_panel, &self.selectors.apply_button_text)
            .await
    }

    /// Applying a filter can retain a stale page offset; go back to page 1
    /// when a control for it exists.
    async fn reset_to_first_page(&self, session: &mut dyn CrawlSession) -> CrawlResult<()> {
        if session
            .click_link_by_text(&self.selectors.review_pager_scope, "1")
            .await?
        {
            session.idle(self.waits.settle_range()).await?;
        }
        Ok(())
    }
}
