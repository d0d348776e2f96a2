// Plain data shared by the cache, the lookups and the caller

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One upstream query and one cache slot: a normalized (origin, destination, date) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LookupKey {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

impl LookupKey {
    pub fn new(origin: &str, destination: &str, date: NaiveDate) -> Self {
        Self {
            origin: normalize_code(origin),
            destination: normalize_code(destination),
            date,
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.origin, self.destination, self.date)
    }
}

// Airport codes are compared trimmed and upper-cased
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// One direct hop of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub origin: String,
    pub destination: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// One priced itinerary option for an origin/destination/date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub airline: String,
    pub date: NaiveDate,
    pub price: f64,
    pub segments: Vec<Segment>,
}
