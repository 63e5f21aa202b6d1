//! Explicit cache for fetched price series.
//!
//! Entries are keyed by (instrument, date range) and expire as soon as a new
//! trading session has elapsed since they were fetched, because the source
//! may have published a new close or revised adjusted history.

use crate::types::{DateRange, PriceSeries};
use crate::Result;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashMap;

/// Cache key: instrument identifier plus requested date range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub range: DateRange,
}

impl CacheKey {
    pub fn new(symbol: &str, range: DateRange) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            range,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: PriceSeries,
    /// Latest trading session known when the entry was stored.
    session: NaiveDate,
}

/// Price cache owned and passed in by the caller.
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached series if no trading session has elapsed since it was stored.
    pub fn get(&self, key: &CacheKey, today: NaiveDate) -> Option<&PriceSeries> {
        let entry = self.entries.get(key)?;
        if latest_session(today) > entry.session {
            return None;
        }
        Some(&entry.series)
    }

    pub fn put(&mut self, key: CacheKey, series: PriceSeries, today: NaiveDate) {
        let session = latest_session(today);
        self.entries.insert(key, CacheEntry { series, session });
    }

    /// Return the cached series or fetch, store and return a fresh one.
    ///
    /// Fetch errors are returned as-is and leave the cache untouched.
    pub fn get_or_fetch<F>(&mut self, key: CacheKey, today: NaiveDate, fetch: F) -> Result<PriceSeries>
    where
        F: FnOnce(&CacheKey) -> Result<PriceSeries>,
    {
        if let Some(series) = self.get(&key, today) {
            tracing::debug!("Price cache hit for {}", key.symbol);
            return Ok(series.clone());
        }

        if self.entries.remove(&key).is_some() {
            tracing::debug!("Price cache entry for {} is stale", key.symbol);
        }

        let series = fetch(&key)?;
        self.put(key, series.clone(), today);
        Ok(series)
    }

    /// Drop every entry for a symbol. Returns the number removed.
    pub fn invalidate(&mut self, symbol: &str) -> usize {
        let symbol = symbol.trim().to_uppercase();
        let before = self.entries.len();
        self.entries.retain(|key, _| key.symbol != symbol);
        before - self.entries.len()
    }

    /// Drop entries stored before the latest trading session.
    pub fn clear_stale(&mut self, today: NaiveDate) {
        let session = latest_session(today);
        self.entries.retain(|_, entry| entry.session >= session);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Most recent weekday on or before `today`.
///
/// Exchange holidays are not modelled; a holiday only causes one extra refetch.
pub fn latest_session(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday() {
        Weekday::Sat => 1,
        Weekday::Sun => 2,
        _ => 0,
    };
    today.checked_sub_days(Days::new(back)).unwrap_or(today)
}
