use std::collections::HashSet;

use crate::records::ReviewRecord;

/// Identity key for duplicate suppression, scoped to one product x one
/// filter segment. Identical text from different segments stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Signature {
    customer_name: String,
    date: String,
    review_text: String,
    gender_segment: String,
}

impl Signature {
    fn of(record: &ReviewRecord) -> Self {
        Self {
            customer_name: record.customer_name.clone(),
            date: record.date.clone(),
            review_text: record.review_text.clone(),
            gender_segment: record.gender_segment.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeduplicationTracker {
    seen: HashSet<Signature>,
}

impl DeduplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the record is first of its signature; false means drop.
    pub fn admit(&mut self, record: &ReviewRecord) -> bool {
        self.seen.insert(Signature::of(record))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
