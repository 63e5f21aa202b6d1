//! Core data types for factorboard analytics.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad grouping an instrument belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Factor,
    Region,
    Sector,
    Benchmark,
}

/// An exchange-traded instrument tracked by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Instrument {
    /// Ticker symbol (uppercase)
    pub symbol: String,
    /// Human-readable name
    pub name: String,
    /// Category tag
    pub category: Category,
}

impl Instrument {
    /// Create a new instrument. The symbol is normalized to uppercase.
    pub fn new(symbol: &str, name: &str, category: Category) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            name: name.to_string(),
            category,
        }
    }
}

/// A single daily close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Ordered daily close prices for one instrument.
///
/// Dates are strictly increasing and there is at least one observation.
/// Missing trading days are allowed; lookups resolve to the nearest prior
/// observation and never interpolate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, validating ordering and prices.
    pub fn new(symbol: &str, points: Vec<PricePoint>) -> Result<Self> {
        let symbol = symbol.trim().to_uppercase();

        if points.is_empty() {
            return Err(Error::EmptySeries(symbol));
        }

        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(Error::InvalidSeries {
                    symbol,
                    reason: format!(
                        "dates must be strictly increasing ({} followed by {})",
                        pair[0].date, pair[1].date
                    ),
                });
            }
        }

        if let Some(bad) = points.iter().find(|p| !p.close.is_finite() || p.close <= 0.0) {
            return Err(Error::InvalidSeries {
                symbol,
                reason: format!("non-positive close {} on {}", bad.close, bad.date),
            });
        }

        Ok(Self { symbol, points })
    }

    /// Build a series from observations in arbitrary order.
    ///
    /// Observations are sorted by date. Duplicate dates are still rejected.
    pub fn from_unsorted(symbol: &str, mut points: Vec<PricePoint>) -> Result<Self> {
        points.sort_by_key(|p| p.date);
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> PricePoint {
        self.points[0]
    }

    pub fn last(&self) -> PricePoint {
        self.points[self.points.len() - 1]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Index of the last observation dated on or before `date`.
    pub fn index_on_or_before(&self, date: NaiveDate) -> Option<usize> {
        let after = self.points.partition_point(|p| p.date <= date);
        after.checked_sub(1)
    }

    /// Index of the last observation dated strictly before `date`.
    pub fn index_before(&self, date: NaiveDate) -> Option<usize> {
        let after = self.points.partition_point(|p| p.date < date);
        after.checked_sub(1)
    }

    /// Nearest observation on or before `date` (as-of lookup).
    pub fn on_or_before(&self, date: NaiveDate) -> Option<PricePoint> {
        self.index_on_or_before(date).map(|i| self.points[i])
    }

    /// Observations falling inside `range`, or `None` if there are none.
    pub fn slice(&self, range: &DateRange) -> Option<PriceSeries> {
        let points: Vec<PricePoint> = self
            .points
            .iter()
            .filter(|p| range.contains(p.date))
            .copied()
            .collect();

        if points.is_empty() {
            return None;
        }

        Some(Self {
            symbol: self.symbol.clone(),
            points,
        })
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange(format!("{} is after {}", start, end)));
        }
        Ok(Self { start, end })
    }

    /// Range covering `years` calendar years up to and including `end`.
    pub fn trailing_years(end: NaiveDate, years: u32) -> Self {
        let start = end
            .checked_sub_months(chrono::Months::new(years * 12))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Reason a cell could not be computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// History does not reach back to the lookback date.
    InsufficientHistory,
    /// Too few dates shared by the correlated series.
    InsufficientOverlap,
    /// A series has zero variance over the sample.
    DegenerateVariance,
    /// The benchmark's own cell is unavailable, so no excess can be derived.
    NoBenchmark,
    /// The latest close is too old to stand for the as-of date.
    StalePrice,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Unavailable::InsufficientHistory => "insufficient history",
            Unavailable::InsufficientOverlap => "insufficient overlap",
            Unavailable::DegenerateVariance => "degenerate variance",
            Unavailable::NoBenchmark => "benchmark unavailable",
            Unavailable::StalePrice => "stale price",
        };
        f.write_str(text)
    }
}

/// A table or matrix cell: either a number or an explicit "not available" marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Value(f64),
    NotAvailable(Unavailable),
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(*v),
            Cell::NotAvailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Cell::Value(_))
    }

    /// Value rounded to `decimals` places; unavailable cells pass through.
    pub fn rounded(&self, decimals: u32) -> Cell {
        match self {
            Cell::Value(v) => Cell::Value(round_to(*v, decimals)),
            na => *na,
        }
    }

    /// Format with a fixed number of decimals, `n/a` when unavailable.
    pub fn display(&self, decimals: usize) -> String {
        match self {
            Cell::Value(v) => format!("{:.*}", decimals, v),
            Cell::NotAvailable(_) => "n/a".to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(1))
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
            warnings: Vec::new(),
        }
    }

    /// Attach caller-visible warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}
