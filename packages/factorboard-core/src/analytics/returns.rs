//! Point-to-point period returns.

use crate::baskets::Member;
use crate::periods::{Lookback, Period};
use crate::types::{Cell, Instrument, PriceSeries, Unavailable};
use crate::{Error, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// A series starting this many days into the year still counts as covering
/// the year start (New Year holiday plus a weekend).
const YEAR_START_GRACE_DAYS: u32 = 7;

/// The as-of close must fall within this many calendar days before the as-of
/// date (a weekend plus a holiday fits), or the series is treated as stale.
const STALE_AFTER_DAYS: u64 = 7;

/// Percentage return of `series` over `period`, ending at `as_of`.
///
/// The as-of price is the nearest observation on or before `as_of`. Fails with
/// [`Error::InsufficientHistory`] when the history does not reach the
/// reference date; the window is never shortened to fit. Fails with
/// [`Error::StalePrice`] when the series ends a week or more before `as_of`.
pub fn period_return(series: &PriceSeries, period: Period, as_of: NaiveDate) -> Result<f64> {
    let insufficient = |required: NaiveDate| Error::InsufficientHistory {
        symbol: series.symbol().to_string(),
        required,
    };

    let end = series.index_on_or_before(as_of).ok_or_else(|| insufficient(as_of))?;
    let end_date = series.points()[end].date;

    let stale_before = as_of
        .checked_sub_days(Days::new(STALE_AFTER_DAYS))
        .unwrap_or(NaiveDate::MIN);
    if end_date <= stale_before {
        return Err(Error::StalePrice {
            symbol: series.symbol().to_string(),
            last: end_date,
            as_of,
        });
    }

    let start = match period.lookback(as_of) {
        Lookback::PreviousObservation => end.checked_sub(1).ok_or_else(|| insufficient(end_date))?,
        Lookback::OnOrBefore(date) => series
            .index_on_or_before(date)
            .ok_or_else(|| insufficient(date))?,
        Lookback::Before(date) => series.index_before(date).ok_or_else(|| insufficient(date))?,
        Lookback::FirstInYear(year) => first_in_year(series, year).ok_or_else(|| {
            insufficient(NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(end_date))
        })?,
    };

    // A reference that resolves onto the as-of observation itself is not a return
    if start >= end {
        return Err(insufficient(end_date));
    }

    let points = series.points();
    Ok((points[end].close / points[start].close - 1.0) * 100.0)
}

/// Index of the first observation in `year`, if the history covers the year start.
fn first_in_year(series: &PriceSeries, year: i32) -> Option<usize> {
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let idx = series.index_before(jan_first).map_or(0, |i| i + 1);
    let point = series.points().get(idx)?;

    if point.date.year() != year {
        return None;
    }

    let has_prior_year = idx > 0;
    if !has_prior_year && point.date.ordinal() > YEAR_START_GRACE_DAYS {
        // History begins mid-year: a YTD figure would cover a partial window
        return None;
    }

    Some(idx)
}

/// Returns for each period as table cells.
pub fn return_row(series: &PriceSeries, periods: &[Period], as_of: NaiveDate) -> BTreeMap<Period, Cell> {
    periods
        .iter()
        .map(|&period| {
            let cell = match period_return(series, period, as_of) {
                Ok(value) => Cell::Value(value),
                Err(e @ Error::StalePrice { .. }) => {
                    tracing::debug!("{} {} not available: {}", series.symbol(), period, e);
                    Cell::NotAvailable(Unavailable::StalePrice)
                }
                Err(e) => {
                    tracing::debug!("{} {} not available: {}", series.symbol(), period, e);
                    Cell::NotAvailable(Unavailable::InsufficientHistory)
                }
            };
            (period, cell)
        })
        .collect()
}

/// One instrument's returns.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnRow {
    pub instrument: Instrument,
    pub cells: BTreeMap<Period, Cell>,
}

/// Returns for a set of instruments over a set of periods.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnTable {
    pub as_of: NaiveDate,
    pub periods: Vec<Period>,
    pub rows: Vec<ReturnRow>,
}

impl ReturnTable {
    /// Compute the table. Row order follows `members`.
    pub fn compute(members: &[Member<'_>], periods: &[Period], as_of: NaiveDate) -> Self {
        let mut periods = periods.to_vec();
        periods.sort();
        periods.dedup();

        let rows = members
            .iter()
            .map(|m| ReturnRow {
                instrument: m.instrument.clone(),
                cells: return_row(m.series, &periods, as_of),
            })
            .collect();

        Self { as_of, periods, rows }
    }

    pub fn row(&self, symbol: &str) -> Option<&ReturnRow> {
        let symbol = symbol.trim().to_uppercase();
        self.rows.iter().find(|r| r.instrument.symbol == symbol)
    }

    pub fn cell(&self, symbol: &str, period: Period) -> Option<Cell> {
        self.row(symbol).and_then(|r| r.cells.get(&period).copied())
    }

    /// Copy with every return rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| ReturnRow {
                instrument: row.instrument.clone(),
                cells: row.cells.iter().map(|(p, c)| (*p, c.rounded(decimals))).collect(),
            })
            .collect();

        Self {
            as_of: self.as_of,
            periods: self.periods.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, PricePoint};
    use approx::assert_abs_diff_eq;
    use chrono::{Days, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Weekday closes from `start` to `end`, rising 0.1% per session.
    fn weekday_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> PriceSeries {
        let mut points = Vec::new();
        let mut date = start;
        let mut close = 100.0;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                points.push(PricePoint::new(date, close));
                close *= 1.001;
            }
            date = date.checked_add_days(Days::new(1)).unwrap();
        }
        PriceSeries::new(symbol, points).unwrap()
    }

    #[test]
    fn test_four_day_scenario() {
        let series = PriceSeries::new(
            "A",
            vec![
                PricePoint::new(d(2024, 3, 4), 100.0),
                PricePoint::new(d(2024, 3, 5), 102.0),
                PricePoint::new(d(2024, 3, 6), 105.0),
                PricePoint::new(d(2024, 3, 7), 103.0),
            ],
        )
        .unwrap();

        // 1W from Thursday looks back to the prior Thursday: no data
        assert!(period_return(&series, Period::OneWeek, d(2024, 3, 7)).is_err());

        // WTD: no close before Monday 3/4 either
        assert!(period_return(&series, Period::WeekToDate, d(2024, 3, 7)).is_err());

        let one_day = period_return(&series, Period::OneDay, d(2024, 3, 7)).unwrap();
        assert_abs_diff_eq!(one_day, (103.0 / 105.0 - 1.0) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_four_observations_one_week() {
        // Friday to Friday: the 1W lookback lands exactly on the first close
        let series = PriceSeries::new(
            "A",
            vec![
                PricePoint::new(d(2024, 3, 1), 100.0),
                PricePoint::new(d(2024, 3, 4), 102.0),
                PricePoint::new(d(2024, 3, 5), 105.0),
                PricePoint::new(d(2024, 3, 8), 103.0),
            ],
        )
        .unwrap();

        let r = period_return(&series, Period::OneWeek, d(2024, 3, 8)).unwrap();
        assert_abs_diff_eq!(r, 3.0, epsilon = 1e-9);

        let rolling = crate::analytics::rolling_returns(&series, 4).unwrap();
        assert_eq!(rolling.len(), 1);
        assert_abs_diff_eq!(rolling.points[0].value, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_as_of_after_last_observation() {
        let series = weekday_series("EWU", d(2023, 1, 2), d(2024, 6, 28));
        let as_of = d(2024, 8, 30);

        for period in Period::ALL {
            let result = period_return(&series, period, as_of);
            assert!(
                matches!(result, Err(Error::StalePrice { .. })),
                "{} should not be computed from a stale close",
                period
            );
        }

        let row = return_row(&series, &Period::ALL, as_of);
        for cell in row.values() {
            assert_eq!(*cell, Cell::NotAvailable(Unavailable::StalePrice));
        }
    }

    #[test]
    fn test_reference_on_as_of_observation_is_not_zero() {
        let series = PriceSeries::new(
            "EWU",
            vec![
                PricePoint::new(d(2024, 5, 31), 95.0),
                PricePoint::new(d(2024, 6, 21), 100.0),
            ],
        )
        .unwrap();

        // Tuesday as-of: the latest close (Friday) predates this week's Monday,
        // so the WTD reference and the as-of close are the same observation
        let as_of = d(2024, 6, 25);
        let result = period_return(&series, Period::WeekToDate, as_of);
        assert!(matches!(result, Err(Error::InsufficientHistory { .. })));

        let row = return_row(&series, &[Period::WeekToDate, Period::MonthToDate], as_of);
        assert_eq!(row[&Period::WeekToDate], Cell::NotAvailable(Unavailable::InsufficientHistory));
        let mtd = row[&Period::MonthToDate].value().unwrap();
        assert_abs_diff_eq!(mtd, (100.0 / 95.0 - 1.0) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_one_week_over_calendar_span() {
        let series = PriceSeries::new(
            "A",
            vec![
                PricePoint::new(d(2024, 2, 29), 100.0),
                PricePoint::new(d(2024, 3, 4), 100.0),
                PricePoint::new(d(2024, 3, 5), 102.0),
                PricePoint::new(d(2024, 3, 6), 105.0),
                PricePoint::new(d(2024, 3, 7), 103.0),
            ],
        )
        .unwrap();

        let r = period_return(&series, Period::OneWeek, d(2024, 3, 7)).unwrap();
        assert_abs_diff_eq!(r, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lookback_resolves_to_prior_trading_day() {
        let series = weekday_series("VOO", d(2023, 1, 2), d(2024, 6, 28));
        // 2024-06-28 minus one month = 2024-05-28 (Tuesday)
        let one_month = period_return(&series, Period::OneMonth, d(2024, 6, 28)).unwrap();
        let end_idx = series.index_on_or_before(d(2024, 6, 28)).unwrap();
        let start_idx = series.index_on_or_before(d(2024, 5, 28)).unwrap();
        let expected = (1.001f64.powi((end_idx - start_idx) as i32) - 1.0) * 100.0;
        assert_abs_diff_eq!(one_month, expected, epsilon = 1e-9);

        // Sunday as-of: price from Friday 6/28, lookback from 5/30 (Thursday)
        let on_sunday = period_return(&series, Period::OneMonth, d(2024, 6, 30)).unwrap();
        let start_idx = series.index_on_or_before(d(2024, 5, 30)).unwrap();
        let expected = (1.001f64.powi((end_idx - start_idx) as i32) - 1.0) * 100.0;
        assert_abs_diff_eq!(on_sunday, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_history_for_three_years() {
        let series = weekday_series("EMXC", d(2024, 6, 17), d(2024, 6, 28));
        assert_eq!(series.len(), 10);

        let result = period_return(&series, Period::ThreeYears, d(2024, 6, 28));
        assert!(matches!(result, Err(Error::InsufficientHistory { .. })));

        let row = return_row(&series, &Period::DEFAULT_SET, d(2024, 6, 28));
        assert_eq!(row[&Period::ThreeYears], Cell::NotAvailable(Unavailable::InsufficientHistory));
        assert!(row[&Period::OneDay].is_available());
        assert!(row[&Period::OneWeek].is_available());
        assert_eq!(row.len(), Period::DEFAULT_SET.len());
    }

    #[test]
    fn test_ytd_uses_first_date_of_year() {
        let series = weekday_series("VGT", d(2023, 11, 1), d(2024, 3, 28));
        let ytd = period_return(&series, Period::YearToDate, d(2024, 3, 28)).unwrap();

        let start = series.index_on_or_before(d(2024, 1, 1)).unwrap();
        // Jan 1 2024 is a Monday and is the first observation of the year here
        assert_eq!(series.points()[start].date, d(2024, 1, 1));
        let end = series.index_on_or_before(d(2024, 3, 28)).unwrap();
        let expected = (1.001f64.powi((end - start) as i32) - 1.0) * 100.0;
        assert_abs_diff_eq!(ytd, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_ytd_not_available_for_mid_year_listing() {
        let series = weekday_series("EMXC", d(2024, 2, 1), d(2024, 3, 28));
        assert!(period_return(&series, Period::YearToDate, d(2024, 3, 28)).is_err());

        // Starting within the first week of January still covers the year
        let series = weekday_series("EMXC", d(2024, 1, 3), d(2024, 3, 28));
        assert!(period_return(&series, Period::YearToDate, d(2024, 3, 28)).is_ok());
    }

    #[test]
    fn test_to_date_periods_use_prior_close() {
        let series = PriceSeries::new(
            "EWC",
            vec![
                PricePoint::new(d(2024, 6, 27), 90.0),
                PricePoint::new(d(2024, 6, 28), 100.0),
                PricePoint::new(d(2024, 7, 1), 104.0),
                PricePoint::new(d(2024, 7, 2), 110.0),
            ],
        )
        .unwrap();

        // Month, quarter and week all started on Monday 7/1; prior close is 6/28
        for period in [Period::WeekToDate, Period::MonthToDate, Period::QuarterToDate] {
            let r = period_return(&series, period, d(2024, 7, 2)).unwrap();
            assert_abs_diff_eq!(r, 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_idempotent() {
        let series = weekday_series("QUAL", d(2020, 1, 1), d(2024, 6, 28));
        let first = return_row(&series, &Period::ALL, d(2024, 6, 28));
        let second = return_row(&series, &Period::ALL, d(2024, 6, 28));
        assert_eq!(first, second);
    }

    #[test]
    fn test_return_table() {
        let long = weekday_series("VOO", d(2019, 1, 1), d(2024, 6, 28));
        let short = weekday_series("EMXC", d(2024, 6, 17), d(2024, 6, 28));
        let members = vec![
            Member::new(Instrument::new("VOO", "USA (S&P 500)", Category::Region), &long),
            Member::new(Instrument::new("EMXC", "EM ex-China", Category::Region), &short),
        ];

        let periods = [Period::FiveYears, Period::OneDay, Period::OneDay];
        let table = ReturnTable::compute(&members, &periods, d(2024, 6, 28));

        assert_eq!(table.periods, vec![Period::OneDay, Period::FiveYears]);
        assert_eq!(table.rows.len(), 2);
        assert!(table.cell("voo", Period::FiveYears).unwrap().is_available());
        assert!(!table.cell("EMXC", Period::FiveYears).unwrap().is_available());
        assert!(table.cell("EMXC", Period::OneDay).unwrap().is_available());
        assert!(table.cell("MISSING", Period::OneDay).is_none());
    }
}
