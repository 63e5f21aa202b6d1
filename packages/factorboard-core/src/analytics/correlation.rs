//! Pairwise correlation of daily returns.
//!
//! Returns are simple daily percentage changes, the same convention as the
//! return tables. Only dates present in every series are used, so one short
//! history shrinks the sample for every pair. Overlap thresholds count shared
//! price dates; `n` shared dates give `n - 1` returns.

use crate::baskets::Member;
use crate::types::{Cell, Instrument, Unavailable};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Minimum number of shared price dates for a correlation cell.
pub const DEFAULT_MIN_OVERLAP: usize = 20;

/// Simple returns (`p[i] / p[i-1] - 1`) of a price sequence.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Pearson correlation coefficient.
///
/// Returns `None` for empty or mismatched inputs and when either side has
/// zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }

    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Correlate two date-aligned return series.
///
/// `min_overlap` counts the shared price dates behind the returns, so `n`
/// returns on each side stand for `n + 1` dates. Fails with
/// [`Error::MisalignedReturns`] when the sides differ in length and with
/// [`Error::InsufficientOverlap`] below `min_overlap` dates. A zero-variance
/// side yields `Ok(None)`.
pub fn correlate_returns(a: &[f64], b: &[f64], min_overlap: usize) -> Result<Option<f64>> {
    if a.len() != b.len() {
        return Err(Error::MisalignedReturns {
            left: a.len(),
            right: b.len(),
        });
    }

    let shared_dates = shared_dates_for(a.len());
    if shared_dates < min_overlap {
        return Err(Error::InsufficientOverlap {
            found: shared_dates,
            required: min_overlap,
        });
    }
    Ok(pearson(a, b))
}

fn shared_dates_for(returns: usize) -> usize {
    if returns == 0 {
        0
    } else {
        returns + 1
    }
}

fn has_variance(returns: &[f64]) -> bool {
    match returns.first() {
        Some(first) => returns.iter().any(|r| r != first),
        None => false,
    }
}

/// Symmetric correlation matrix labelled by instrument on both axes.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<Instrument>,
    pub values: Vec<Vec<Cell>>,
    /// Price dates shared by all instruments
    pub shared_dates: usize,
    /// Return observations shared by all instruments
    pub observations: usize,
    /// First and last shared price date
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CorrelationMatrix {
    /// Compute the matrix over the dates common to all members.
    pub fn compute(members: &[Member<'_>], min_overlap: usize) -> Self {
        let common = common_dates(members);

        let returns: Vec<Vec<f64>> = members
            .iter()
            .map(|m| {
                let closes: Vec<f64> = common
                    .iter()
                    .filter_map(|d| m.series.on_or_before(*d).map(|p| p.close))
                    .collect();
                daily_returns(&closes)
            })
            .collect();

        let shared_dates = common.len();
        if shared_dates < min_overlap && !members.is_empty() {
            tracing::warn!(
                "Correlation sample has {} shared dates, {} required",
                shared_dates,
                min_overlap
            );
        }

        let n = members.len();
        let mut values = vec![vec![Cell::NotAvailable(Unavailable::InsufficientOverlap); n]; n];

        for i in 0..n {
            for j in i..n {
                let cell = if i == j {
                    match correlate_returns(&returns[i], &returns[i], min_overlap) {
                        Ok(_) if has_variance(&returns[i]) => Cell::Value(1.0),
                        Ok(_) => Cell::NotAvailable(Unavailable::DegenerateVariance),
                        Err(_) => Cell::NotAvailable(Unavailable::InsufficientOverlap),
                    }
                } else {
                    match correlate_returns(&returns[i], &returns[j], min_overlap) {
                        Ok(Some(r)) => Cell::Value(r),
                        Ok(None) => Cell::NotAvailable(Unavailable::DegenerateVariance),
                        Err(_) => Cell::NotAvailable(Unavailable::InsufficientOverlap),
                    }
                };
                values[i][j] = cell;
                values[j][i] = cell;
            }
        }

        Self {
            labels: members.iter().map(|m| m.instrument.clone()).collect(),
            values,
            shared_dates,
            observations: shared_dates.saturating_sub(1),
            start: common.first().copied(),
            end: common.last().copied(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Copy with every coefficient rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|row| row.iter().map(|c| c.rounded(decimals)).collect())
                .collect(),
            ..self.clone()
        }
    }

    fn index_of(&self, symbol: &str) -> Option<usize> {
        let symbol = symbol.trim().to_uppercase();
        self.labels.iter().position(|l| l.symbol == symbol)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<Cell> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i][j])
    }
}

fn common_dates(members: &[Member<'_>]) -> Vec<NaiveDate> {
    let Some((first, rest)) = members.split_first() else {
        return Vec::new();
    };

    let mut common: BTreeSet<NaiveDate> = first.series.dates().collect();
    for member in rest {
        let dates: BTreeSet<NaiveDate> = member.series.dates().collect();
        common.retain(|d| dates.contains(d));
    }

    common.into_iter().collect()
}
