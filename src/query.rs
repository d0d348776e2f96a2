// Multi-origin / multi-destination / multi-date queries and their expansion into lookup keys

use crate::error::QueryError;
use crate::model::{normalize_code, LookupKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Query {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
    #[serde(alias = "departure_dates")]
    pub dates: Vec<NaiveDate>,
}

impl Query {
    pub fn new(
        origins: Vec<String>,
        destinations: Vec<String>,
        dates: Vec<NaiveDate>,
    ) -> Result<Self, QueryError> {
        let query = Self {
            origins,
            destinations,
            dates,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.origins.is_empty() {
            return Err(QueryError::EmptyOrigins);
        }
        if self.destinations.is_empty() {
            return Err(QueryError::EmptyDestinations);
        }
        if self.dates.is_empty() {
            return Err(QueryError::EmptyDates);
        }
        Ok(())
    }

    /// Lookup keys for every origin × destination × date, origin-major.
    ///
    /// Codes are normalized first; entries that collapse to the same value
    /// are expanded once, keeping the first occurrence's position.
    pub fn expand(&self) -> impl Iterator<Item = LookupKey> {
        let origins = unique(self.origins.iter().map(|code| normalize_code(code)));
        let destinations = unique(self.destinations.iter().map(|code| normalize_code(code)));
        let dates = unique(self.dates.iter().copied());

        origins.into_iter().flat_map(move |origin| {
            let dates = dates.clone();
            destinations.clone().into_iter().flat_map(move |destination| {
                let origin = origin.clone();
                dates.clone().into_iter().map(move |date| LookupKey {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    date,
                })
            })
        })
    }

    pub fn key_count(&self) -> usize {
        self.expand().count()
    }
}

// Order-preserving dedup, the axes are small
fn unique<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
