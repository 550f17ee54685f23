use regex::Regex;

use crate::records::{GenderSegment, ReviewRecord, ANONYMOUS_CUSTOMER, MISSING_FIELD};

use super::session::ReviewEntryRaw;
use super::tags::split_skin_tags;

/// Maps one raw entry into a typed record. Every field read is best-effort:
/// a missing sub-element yields the field's default, never an error.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    rating_regex: Regex,
}

impl RecordExtractor {
    pub fn new() -> Self {
        let rating_regex = Regex::new(r"\d+(?:\.\d+)?").expect("valid regex");
        Self { rating_regex }
    }

    pub fn extract(&self, raw: &ReviewEntryRaw, segment: GenderSegment) -> ReviewRecord {
        let customer_name = non_empty(raw.customer_name.as_deref())
            .unwrap_or(ANONYMOUS_CUSTOMER)
            .to_string();
        let tags = split_skin_tags(raw.tags.iter());
        let review_text = non_empty(raw.body.as_deref()).unwrap_or_default().to_string();
        let date = non_empty(raw.date.as_deref())
            .unwrap_or(MISSING_FIELD)
            .to_string();
        let rating_text = non_empty(raw.rating_text.as_deref())
            .unwrap_or_default()
            .to_string();
        let rating = self.parse_rating(&rating_text);

        ReviewRecord {
            customer_name,
            skin_type: tags.skin_type.clone(),
            skin_tone: tags.skin_tone.clone(),
            skin_concerns: tags.concerns_joined(),
            review_text,
            date,
            rating_text,
            rating,
            gender_segment: segment.label().to_string(),
        }
    }

    /// Last numeric token in the label, scanned left to right. Labels read
    /// like "5점 만점에 4.5점"; the trailing number is the actual score.
    pub fn parse_rating(&self, text: &str) -> Option<f64> {
        self.rating_regex
            .find_iter(text)
            .last()
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }
}

impl Default for RecordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
