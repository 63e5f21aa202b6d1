//! Rebasing price series to a common index value.

use crate::baskets::Member;
use crate::types::{PricePoint, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// Index value at the anchor date.
pub const DEFAULT_BASE: f64 = 100.0;

/// A price series scaled so that its value at the anchor equals `base`.
#[derive(Debug, Clone, Serialize)]
pub struct RebasedSeries {
    /// Anchor date requested by the caller
    pub anchor: NaiveDate,
    /// Observation actually used (nearest on or before the anchor)
    pub anchor_used: NaiveDate,
    /// Value assigned at the anchor
    pub base: f64,
    pub series: PriceSeries,
}

impl RebasedSeries {
    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    /// Rebased value on or before `date`.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.series.on_or_before(date).map(|p| p.close)
    }
}

/// Rebase `series` so that its value at `anchor` is 100.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use factorboard_core::{rebase, PricePoint, PriceSeries};
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
/// let series = PriceSeries::new(
///     "EWJ",
///     vec![PricePoint::new(day(2), 50.0), PricePoint::new(day(3), 55.0)],
/// )
/// .unwrap();
///
/// let rebased = rebase(&series, day(2)).unwrap();
/// assert_eq!(rebased.value_at(day(2)), Some(100.0));
/// assert!((rebased.value_at(day(3)).unwrap() - 110.0).abs() < 1e-9);
/// ```
pub fn rebase(series: &PriceSeries, anchor: NaiveDate) -> Result<RebasedSeries> {
    rebase_to(series, anchor, DEFAULT_BASE)
}

/// Rebase `series` so that its value at `anchor` equals `base`.
///
/// A non-trading anchor resolves to the nearest prior observation. Fails with
/// [`Error::MissingAnchor`] if the series starts after the anchor.
pub fn rebase_to(series: &PriceSeries, anchor: NaiveDate, base: f64) -> Result<RebasedSeries> {
    if !base.is_finite() || base <= 0.0 {
        return Err(Error::InvalidConfig(format!("rebase value must be positive, got {}", base)));
    }

    let anchor_point = series.on_or_before(anchor).ok_or_else(|| Error::MissingAnchor {
        symbol: series.symbol().to_string(),
        anchor,
    })?;

    let points = series
        .points()
        .iter()
        .map(|p| PricePoint::new(p.date, p.close / anchor_point.close * base))
        .collect();

    Ok(RebasedSeries {
        anchor,
        anchor_used: anchor_point.date,
        base,
        series: PriceSeries::new(series.symbol(), points)?,
    })
}

/// Rebase every member, collecting failures as warnings.
pub fn rebase_members(members: &[Member<'_>], anchor: NaiveDate, base: f64) -> (Vec<RebasedSeries>, Vec<String>) {
    let mut rebased = Vec::with_capacity(members.len());
    let mut warnings = Vec::new();

    for member in members {
        match rebase_to(member.series, anchor, base) {
            Ok(r) => rebased.push(r),
            Err(e) => {
                tracing::warn!("Cannot rebase {}: {}", member.instrument.symbol, e);
                warnings.push(format!("{}: {}", member.instrument.name, e));
            }
        }
    }

    (rebased, warnings)
}
