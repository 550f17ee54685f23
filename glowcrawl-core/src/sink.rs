use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use csv::Writer;
use thiserror::Error;
use tracing::info;

use crate::config::OutputSection;
use crate::records::{Product, ReviewRecord};

/// Spreadsheet tools need the BOM to decode Korean text correctly.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const PRODUCT_HEADER: [&str; 3] = ["product_name", "product_brand", "product_link"];

const REVIEW_HEADER: [&str; 12] = [
    "product_name",
    "product_brand",
    "product_link",
    "customer_name",
    "skin_type",
    "skin_tone",
    "skin_concerns",
    "review",
    "date",
    "rating_text",
    "rating",
    "gender",
];

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Where crawl output lands. The orchestrator writes the product list once
/// after discovery and appends reviews after each product so partial
/// progress survives a crash.
pub trait PersistenceSink {
    fn write_product_list(&mut self, products: &[Product]) -> SinkResult<()>;
    fn append_reviews(&mut self, product: &Product, records: &[ReviewRecord]) -> SinkResult<()>;
}

pub struct CsvSink {
    directory: PathBuf,
    product_list_file: String,
    reviews_file: String,
    reviews: Option<Writer<File>>,
}

impl CsvSink {
    pub fn new(output: &OutputSection) -> Self {
        Self {
            directory: PathBuf::from(&output.directory),
            product_list_file: output.product_list_file.clone(),
            reviews_file: output.reviews_file.clone(),
            reviews: None,
        }
    }

    fn create_with_bom(&self, file_name: &str) -> SinkResult<File> {
        fs::create_dir_all(&self.directory)?;
        let mut file = File::create(self.directory.join(file_name))?;
        file.write_all(UTF8_BOM)?;
        Ok(file)
    }

    /// The reviews file is created lazily so a crawl that discovers nothing
    /// leaves no empty artifact behind.
    fn ensure_reviews_writer(&mut self) -> SinkResult<()> {
        if self.reviews.is_some() {
            return Ok(());
        }
        let file = self.create_with_bom(&self.reviews_file)?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(REVIEW_HEADER)?;
        writer.flush()?;
        info!(file = %self.reviews_file, "reviews csv initialized");
        self.reviews = Some(writer);
        Ok(())
    }
}

impl PersistenceSink for CsvSink {
    fn write_product_list(&mut self, products: &[Product]) -> SinkResult<()> {
        let file = self.create_with_bom(&self.product_list_file)?;
        let mut writer = Writer::from_writer(file);
        writer.write_record(PRODUCT_HEADER)?;
        for product in products {
            writer.write_record([
                product.name.as_str(),
                product.brand.as_str(),
                product.link.as_str(),
            ])?;
        }
        writer.flush()?;
        info!(file = %self.product_list_file, count = products.len(), "product list written");
        Ok(())
    }

    fn append_reviews(&mut self, product: &Product, records: &[ReviewRecord]) -> SinkResult<()> {
        self.ensure_reviews_writer()?;
        let Some(writer) = self.reviews.as_mut() else {
            return Ok(());
        };
        for record in records {
            let rating = record
                .rating
                .map(|value| value.to_string())
                .unwrap_or_default();
            writer.write_record([
                product.name.as_str(),
                product.brand.as_str(),
                product.link.as_str(),
                record.customer_name.as_str(),
                record.skin_type.as_str(),
                record.skin_tone.as_str(),
                record.skin_concerns.as_str(),
                record.review_text.as_str(),
                record.date.as_str(),
                record.rating_text.as_str(),
                rating.as_str(),
                record.gender_segment.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
