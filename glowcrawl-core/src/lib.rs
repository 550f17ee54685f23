pub mod config;
pub mod crawler;
pub mod error;
pub mod records;
pub mod sink;

pub use config::{
    load_crawler_config, ChromiumSection, CrawlerConfig, ObservabilitySection, OutputSection,
    SearchSection, SelectorSection, WaitSection,
};
pub use error::{ConfigError, Result};
pub use records::{
    GenderSegment, Product, ReviewRecord, ANONYMOUS_CUSTOMER, MISSING_FIELD,
};
pub use sink::{CsvSink, PersistenceSink, SinkError, SinkResult};
