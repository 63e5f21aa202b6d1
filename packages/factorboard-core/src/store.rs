//! Price store and the data-source seam that fills it.

use crate::cache::{CacheKey, PriceCache};
use crate::types::{DateRange, PricePoint, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Anything that can supply raw daily closes for a symbol.
///
/// Observations may come back unordered; an empty result means the source
/// has no data for the symbol in that range.
pub trait PriceSource {
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, range: &DateRange) -> Result<Vec<PricePoint>>;
}

/// Price source backed by a JSON snapshot file.
///
/// Format: `{ "SYMBOL": [ { "date": "YYYY-MM-DD", "close": 1.0 }, ... ] }`
#[derive(Debug)]
pub struct JsonFileSource {
    path: PathBuf,
    data: HashMap<String, Vec<PricePoint>>,
}

impl JsonFileSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)?;
        let raw: HashMap<String, Vec<PricePoint>> = serde_json::from_str(&content)?;

        let data = raw
            .into_iter()
            .map(|(symbol, points)| (symbol.trim().to_uppercase(), points))
            .collect();

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.data.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl PriceSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-snapshot"
    }

    fn fetch(&self, symbol: &str, range: &DateRange) -> Result<Vec<PricePoint>> {
        let symbol = symbol.trim().to_uppercase();
        Ok(self
            .data
            .get(&symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| range.contains(p.date))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Immutable set of price series keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct PriceStore {
    series: BTreeMap<String, PriceSeries>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_series(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        let mut store = Self::new();
        for s in series {
            store.insert(s);
        }
        store
    }

    /// Fill a store from a source, going through the caller's cache.
    ///
    /// Symbols the source cannot serve are skipped and reported in the
    /// returned warnings. Fails only if nothing could be loaded.
    pub fn populate(
        source: &dyn PriceSource,
        cache: &mut PriceCache,
        symbols: &[&str],
        range: DateRange,
        today: NaiveDate,
    ) -> Result<(Self, Vec<String>)> {
        let mut store = Self::new();
        let mut warnings = Vec::new();

        for symbol in symbols {
            let key = CacheKey::new(symbol, range);
            let fetched = cache.get_or_fetch(key, today, |key| {
                let points = source.fetch(&key.symbol, &key.range)?;
                PriceSeries::from_unsorted(&key.symbol, points)
            });

            match fetched {
                Ok(series) => {
                    store.insert(series);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} from {}: {}", symbol, source.name(), e);
                    warnings.push(format!("{}: {}", symbol.to_uppercase(), e));
                }
            }
        }

        if store.is_empty() {
            return Err(Error::EmptyPriceStore);
        }

        tracing::info!(
            "Loaded {} of {} symbols from {}",
            store.len(),
            symbols.len(),
            source.name()
        );

        Ok((store, warnings))
    }

    /// Insert a series, replacing any existing one for the symbol.
    pub fn insert(&mut self, series: PriceSeries) -> Option<PriceSeries> {
        self.series.insert(series.symbol().to_string(), series)
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(&symbol.trim().to_uppercase())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }

    /// Latest date every listed symbol has reached (minimum of last dates).
    ///
    /// Symbols missing from the store are ignored.
    pub fn latest_common_date(&self, symbols: &[&str]) -> Option<NaiveDate> {
        symbols
            .iter()
            .filter_map(|s| self.get(s))
            .map(|s| s.last().date)
            .min()
    }

    /// Write the store as a JSON snapshot readable by [`JsonFileSource`].
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw: BTreeMap<&str, &[PricePoint]> = self
            .series
            .iter()
            .map(|(symbol, series)| (symbol.as_str(), series.points()))
            .collect();

        let content = serde_json::to_string_pretty(&raw)?;
        fs::write(path, content)?;
        Ok(())
    }
}
