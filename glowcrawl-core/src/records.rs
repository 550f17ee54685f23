use std::fmt;

use serde::Serialize;

/// Sentinel for reviews posted without a visible customer id.
pub const ANONYMOUS_CUSTOMER: &str = "Anonymous";
/// Sentinel for fields whose source element is absent.
pub const MISSING_FIELD: &str = "N/A";

/// One product entry discovered on the listing. Identity is (name, link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub name: String,
    pub brand: String,
    pub link: String,
}

impl Product {
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.link)
    }
}

/// The two mutually exclusive audience segments the review filter scopes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GenderSegment {
    Female,
    Male,
}

impl GenderSegment {
    pub const ALL: [GenderSegment; 2] = [GenderSegment::Female, GenderSegment::Male];

    /// Value attribute of the underlying radio input.
    pub fn code(self) -> &'static str {
        match self {
            GenderSegment::Female => "F",
            GenderSegment::Male => "M",
        }
    }

    /// Display label as rendered in the filter panel and in the output rows.
    pub fn label(self) -> &'static str {
        match self {
            GenderSegment::Female => "여성",
            GenderSegment::Male => "남성",
        }
    }

    /// Element id the panel binds the radio label to.
    pub fn input_id(self) -> &'static str {
        match self {
            GenderSegment::Female => "sati_type5_1",
            GenderSegment::Male => "sati_type5_2",
        }
    }
}

impl fmt::Display for GenderSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One extracted review. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub customer_name: String,
    pub skin_type: String,
    pub skin_tone: String,
    pub skin_concerns: String,
    pub review_text: String,
    pub date: String,
    pub rating_text: String,
    pub rating: Option<f64>,
    pub gender_segment: String,
}
