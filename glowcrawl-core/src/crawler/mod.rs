mod dedup;
mod discovery;
mod error;
mod extract;
mod filter;
mod orchestrator;
mod pagination;
mod recovery;
mod scripts;
mod session;
mod tags;

pub use dedup::DeduplicationTracker;
pub use discovery::ListingDiscoverer;
pub use error::{CrawlError, CrawlResult};
pub use extract::RecordExtractor;
pub use filter::{FilterController, FilterState};
pub use orchestrator::{CrawlOrchestrator, CrawlStats, FailureEntry, FailureLog};
pub use pagination::PaginationWalker;
pub use recovery::{FaultRecoveryCoordinator, UnitOutcome};
pub use session::{
    wait_for_any, BrowserSession, BrowserSessionFactory, CrawlSession, ProductCardRaw,
    ReviewEntryRaw, SessionFactory,
};
pub use tags::{split_skin_tags, SkinTags};
