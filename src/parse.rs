// Mapping of raw provider records into offers

use crate::error::ParseError;
use crate::model::{Offer, Segment};
use crate::provider::{RawAmount, RawOffer, RawSegment};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Maps one upstream response into offers, one per raw record, order preserved.
///
/// Only the first itinerary of each record is read; return legs are ignored.
pub fn parse_offers(raw_offers: &[RawOffer]) -> Result<Vec<Offer>, ParseError> {
    raw_offers
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_offer(index, raw))
        .collect()
}

fn parse_offer(index: usize, raw: &RawOffer) -> Result<Offer, ParseError> {
    let itinerary = raw
        .itineraries
        .first()
        .ok_or(ParseError::MissingItinerary { index })?;
    let first = itinerary
        .segments
        .first()
        .ok_or(ParseError::MissingSegments { index })?;

    let segments = itinerary
        .segments
        .iter()
        .map(parse_segment)
        .collect::<Result<Vec<_>, _>>()?;

    let airline = raw
        .validating_airline_codes
        .as_ref()
        .and_then(|codes| codes.first())
        .or(first.carrier_code.as_ref())
        .cloned()
        .unwrap_or_default();

    Ok(Offer {
        airline,
        date: departure_date(&first.departure.at)?,
        price: parse_price(&raw.price.total)?,
        segments,
    })
}

fn parse_segment(raw: &RawSegment) -> Result<Segment, ParseError> {
    Ok(Segment {
        origin: raw.departure.iata_code.clone(),
        destination: raw.arrival.iata_code.clone(),
        start_time: parse_timestamp(&raw.departure.at)?,
        end_time: parse_timestamp(&raw.arrival.at)?,
    })
}

// Calendar day of a departure as seen at the departure airport, before any UTC shift
fn departure_date(raw: &str) -> Result<NaiveDate, ParseError> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(with_offset) => Ok(with_offset.date_naive()),
        Err(_) => parse_timestamp(raw).map(|at| at.date()),
    }
}

/// Parses an ISO-8601 timestamp into a naive wall-clock time.
///
/// Timestamps carrying an offset (a trailing `Z` included) are converted to UTC;
/// timestamps without one are kept as the provider sent them.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ParseError> {
    let raw = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_utc());
    }

    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}

fn parse_price(total: &RawAmount) -> Result<f64, ParseError> {
    let price = match total {
        RawAmount::Number(value) => *value,
        RawAmount::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidPrice(text.clone()))?,
    };

    if price.is_finite() {
        Ok(price)
    } else {
        Err(ParseError::InvalidPrice(price.to_string()))
    }
}
