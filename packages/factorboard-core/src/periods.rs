//! Lookback periods for the return tables.
//!
//! The set of periods is closed: each variant knows how to derive the date it
//! looks back to from an as-of date.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named lookback period.
///
/// Variant order is the column order used by tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "WTD")]
    WeekToDate,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "MTD")]
    MonthToDate,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "QTD")]
    QuarterToDate,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "YTD")]
    YearToDate,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[serde(rename = "5Y")]
    FiveYears,
}

/// How a period selects its reference observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// The observation immediately preceding the as-of observation.
    PreviousObservation,
    /// Nearest observation on or before the date.
    OnOrBefore(NaiveDate),
    /// Last observation strictly before the date (close before a period began).
    Before(NaiveDate),
    /// First observation in the calendar year.
    FirstInYear(i32),
}

impl Period {
    pub const ALL: [Period; 12] = [
        Period::OneDay,
        Period::WeekToDate,
        Period::OneWeek,
        Period::MonthToDate,
        Period::OneMonth,
        Period::QuarterToDate,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::YearToDate,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    /// Periods shown when the configuration does not override them.
    pub const DEFAULT_SET: [Period; 9] = [
        Period::OneDay,
        Period::OneWeek,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::YearToDate,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::OneDay => "1D",
            Period::WeekToDate => "WTD",
            Period::OneWeek => "1W",
            Period::MonthToDate => "MTD",
            Period::OneMonth => "1M",
            Period::QuarterToDate => "QTD",
            Period::ThreeMonths => "3M",
            Period::SixMonths => "6M",
            Period::YearToDate => "YTD",
            Period::OneYear => "1Y",
            Period::ThreeYears => "3Y",
            Period::FiveYears => "5Y",
        }
    }

    /// Reference rule for this period relative to `as_of`.
    pub fn lookback(&self, as_of: NaiveDate) -> Lookback {
        match self {
            Period::OneDay => Lookback::PreviousObservation,
            Period::OneWeek => Lookback::OnOrBefore(sub_days(as_of, 7)),
            Period::OneMonth => Lookback::OnOrBefore(sub_months(as_of, 1)),
            Period::ThreeMonths => Lookback::OnOrBefore(sub_months(as_of, 3)),
            Period::SixMonths => Lookback::OnOrBefore(sub_months(as_of, 6)),
            Period::OneYear => Lookback::OnOrBefore(sub_months(as_of, 12)),
            Period::ThreeYears => Lookback::OnOrBefore(sub_months(as_of, 36)),
            Period::FiveYears => Lookback::OnOrBefore(sub_months(as_of, 60)),
            Period::WeekToDate => Lookback::Before(week_start(as_of)),
            Period::MonthToDate => Lookback::Before(month_start(as_of)),
            Period::QuarterToDate => Lookback::Before(quarter_start(as_of)),
            Period::YearToDate => Lookback::FirstInYear(as_of.year()),
        }
    }
}

fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

fn sub_months(date: NaiveDate, months: u32) -> NaiveDate {
    // chrono clamps to the last day of shorter months (Mar 31 - 1M = Feb 29)
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    sub_days(date, date.weekday().num_days_from_monday() as u64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Period::ALL
            .iter()
            .find(|p| p.label() == wanted)
            .copied()
            .ok_or_else(|| crate::Error::InvalidConfig(format!("unknown period: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_calendar_spans() {
        let as_of = d(2024, 3, 31);
        assert_eq!(Period::OneWeek.lookback(as_of), Lookback::OnOrBefore(d(2024, 3, 24)));
        assert_eq!(Period::OneMonth.lookback(as_of), Lookback::OnOrBefore(d(2024, 2, 29)));
        assert_eq!(Period::SixMonths.lookback(as_of), Lookback::OnOrBefore(d(2023, 9, 30)));
        assert_eq!(Period::ThreeYears.lookback(as_of), Lookback::OnOrBefore(d(2021, 3, 31)));
        assert_eq!(Period::FiveYears.lookback(as_of), Lookback::OnOrBefore(d(2019, 3, 31)));
    }

    #[test]
    fn test_to_date_boundaries() {
        // Thursday 2024-08-15
        let as_of = d(2024, 8, 15);
        assert_eq!(Period::WeekToDate.lookback(as_of), Lookback::Before(d(2024, 8, 12)));
        assert_eq!(Period::MonthToDate.lookback(as_of), Lookback::Before(d(2024, 8, 1)));
        assert_eq!(Period::QuarterToDate.lookback(as_of), Lookback::Before(d(2024, 7, 1)));
        assert_eq!(Period::YearToDate.lookback(as_of), Lookback::FirstInYear(2024));
    }

    #[test]
    fn test_week_start_on_monday() {
        assert_eq!(week_start(d(2024, 8, 12)), d(2024, 8, 12));
        assert_eq!(week_start(d(2024, 8, 18)), d(2024, 8, 12));
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("ytd".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("3Y".parse::<Period>().unwrap(), Period::ThreeYears);
        assert!("2W".parse::<Period>().is_err());
    }

    #[test]
    fn test_column_order() {
        let mut periods = vec![Period::FiveYears, Period::OneDay, Period::YearToDate];
        periods.sort();
        assert_eq!(periods, vec![Period::OneDay, Period::YearToDate, Period::FiveYears]);
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&Period::ThreeMonths).unwrap();
        assert_eq!(json, "\"3M\"");
        let parsed: Period = serde_json::from_str("\"QTD\"").unwrap();
        assert_eq!(parsed, Period::QuarterToDate);
    }
}
