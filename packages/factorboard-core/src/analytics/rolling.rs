//! Trailing fixed-window returns stepped daily.

use crate::types::{round_to, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// One year of trading days.
pub const DEFAULT_WINDOW: usize = 252;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RollingPoint {
    pub date: NaiveDate,
    /// Trailing return in percent
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollingSeries {
    pub symbol: String,
    /// Window length in trading-day observations
    pub window: usize,
    pub points: Vec<RollingPoint>,
}

impl RollingSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<RollingPoint> {
        self.points.last().copied()
    }

    /// Copy with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> RollingSeries {
        RollingSeries {
            symbol: self.symbol.clone(),
            window: self.window,
            points: self
                .points
                .iter()
                .map(|p| RollingPoint {
                    date: p.date,
                    value: round_to(p.value, decimals),
                })
                .collect(),
        }
    }

    /// Points dated on or after `date`.
    pub fn since(&self, date: NaiveDate) -> RollingSeries {
        let from = self.points.partition_point(|p| p.date < date);
        RollingSeries {
            symbol: self.symbol.clone(),
            window: self.window,
            points: self.points[from..].to_vec(),
        }
    }
}

/// Trailing return over each run of `window` consecutive observations.
///
/// The point dated at observation `i` compares the close at `i` with the
/// close at `i + 1 - window`, so a history of `n` observations yields
/// `n - window + 1` points. Shorter histories yield an empty series.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use factorboard_core::{rolling_returns, PricePoint, PriceSeries};
///
/// let points = (1..=5)
///     .map(|d| PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), 100.0 + d as f64))
///     .collect();
/// let series = PriceSeries::new("VOO", points).unwrap();
///
/// let rolling = rolling_returns(&series, 3).unwrap();
/// assert_eq!(rolling.len(), 3);
/// ```
pub fn rolling_returns(series: &PriceSeries, window: usize) -> Result<RollingSeries> {
    if window < 2 {
        return Err(Error::InvalidConfig(format!(
            "rolling window must span at least 2 observations, got {}",
            window
        )));
    }

    let prices = series.points();
    if prices.len() < window {
        tracing::debug!(
            "{} has {} observations, fewer than the {}-day window",
            series.symbol(),
            prices.len(),
            window
        );
    }

    let points = prices
        .windows(window)
        .map(|w| {
            let first = w[0];
            let last = w[window - 1];
            RollingPoint {
                date: last.date,
                value: (last.close / first.close - 1.0) * 100.0,
            }
        })
        .collect();

    Ok(RollingSeries {
        symbol: series.symbol().to_string(),
        window,
        points,
    })
}
