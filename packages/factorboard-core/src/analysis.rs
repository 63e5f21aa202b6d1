//! Request-scoped analysis of the dashboard views.
//!
//! Each call computes everything fresh from the store. Per-instrument
//! problems become warnings on the report; only structurally invalid
//! requests return an error.

use crate::analytics::{
    rebase_members, rolling_returns, ComparisonTable, CorrelationMatrix, RebasedSeries,
    ReturnTable, RollingSeries,
};
use crate::baskets::{Basket, Member};
use crate::config::AnalysisConfig;
use crate::store::PriceStore;
use crate::types::{DateRange, Instrument, PriceSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// Decimal places for percentage returns in rendered output.
pub const PERCENT_DECIMALS: u32 = 1;
/// Decimal places for correlation coefficients in rendered output.
pub const CORRELATION_DECIMALS: u32 = 2;
/// Decimal places for the [-1, 1] excess intensity shading.
pub const INTENSITY_DECIMALS: u32 = 2;

/// Performance view for one basket.
#[derive(Debug, Clone, Serialize)]
pub struct BasketReport {
    pub basket: String,
    pub name: String,
    pub range: DateRange,
    pub as_of: NaiveDate,
    pub anchor: NaiveDate,
    pub rebased: Vec<RebasedSeries>,
    pub returns: ReturnTable,
    pub comparison: ComparisonTable,
    pub warnings: Vec<String>,
}

impl BasketReport {
    /// Copy with returns and excess returns at display precision.
    pub fn rounded(&self) -> Self {
        Self {
            returns: self.returns.rounded(PERCENT_DECIMALS),
            comparison: self.comparison.rounded(PERCENT_DECIMALS),
            ..self.clone()
        }
    }
}

/// Risk and correlation view.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub range: DateRange,
    pub correlation: CorrelationMatrix,
    pub rolling: Vec<RollingSeries>,
    pub warnings: Vec<String>,
}

impl RiskReport {
    /// Copy with correlations and rolling returns at display precision.
    pub fn rounded(&self) -> Self {
        Self {
            correlation: self.correlation.rounded(CORRELATION_DECIMALS),
            rolling: self
                .rolling
                .iter()
                .map(|r| r.rounded(PERCENT_DECIMALS))
                .collect(),
            ..self.clone()
        }
    }
}

/// Run the performance view for `basket` over `range`.
///
/// The configured benchmark override, if any, replaces the basket's own.
pub fn analyze_basket(
    store: &PriceStore,
    basket: &Basket,
    config: &AnalysisConfig,
    range: DateRange,
) -> Result<BasketReport> {
    config.validate()?;

    let basket = match config.benchmark_for(&basket.id) {
        Some(symbol) => basket.with_benchmark(symbol),
        None => basket.clone(),
    };

    let resolved = basket.resolve(store)?;
    let mut warnings = resolved.warnings.clone();
    let all = resolved.all();

    let anchor = config.anchor_date.unwrap_or(range.start);
    let (rebased, rebase_warnings) = rebase_members(&all, anchor, config.rebase_base);
    warnings.extend(rebase_warnings);

    let as_of = match config.as_of {
        Some(date) => date,
        None => store
            .latest_common_date(&resolved.symbols())
            .ok_or(Error::EmptyPriceStore)?,
    };

    // Returns are scale-invariant, so rebased and raw series give the same
    // figures; instruments that could not be rebased fall back to raw prices.
    let inputs: Vec<Member<'_>> = all
        .iter()
        .map(|m| {
            let series: &PriceSeries = rebased
                .iter()
                .find(|r| r.symbol() == m.instrument.symbol)
                .map(|r| &r.series)
                .unwrap_or(m.series);
            Member::new(m.instrument.clone(), series)
        })
        .collect();

    let returns = ReturnTable::compute(&inputs, &config.periods, as_of);
    let comparison = ComparisonTable::build(&returns, &resolved.benchmark.instrument.symbol)?;

    tracing::info!(
        "Analyzed {} basket: {} instruments as of {}",
        resolved.id,
        returns.rows.len(),
        as_of
    );

    Ok(BasketReport {
        basket: resolved.id.clone(),
        name: resolved.name.clone(),
        range,
        as_of,
        anchor,
        rebased,
        returns,
        comparison,
        warnings,
    })
}

/// Run the risk view over `instruments`.
///
/// Correlations use prices inside `range` only. Rolling returns use the full
/// stored history so the window is already warm at the start of `range`, and
/// are then trimmed to it.
pub fn analyze_risk(
    store: &PriceStore,
    instruments: &[Instrument],
    config: &AnalysisConfig,
    range: DateRange,
) -> Result<RiskReport> {
    config.validate()?;

    if store.is_empty() {
        return Err(Error::EmptyPriceStore);
    }

    let mut warnings = Vec::new();
    let mut available = Vec::new();
    for instrument in instruments {
        match store.get(&instrument.symbol) {
            Some(series) => available.push(Member::new(instrument.clone(), series)),
            None => {
                let e = Error::EmptySeries(instrument.symbol.clone());
                tracing::warn!("Excluding {} from risk view: {}", instrument.symbol, e);
                warnings.push(format!("{} excluded: {}", instrument.name, e));
            }
        }
    }

    let windowed: Vec<PriceSeries> = available
        .iter()
        .filter_map(|m| m.series.slice(&range))
        .collect();
    let in_range: Vec<Member<'_>> = available
        .iter()
        .filter_map(|m| {
            windowed
                .iter()
                .find(|s| s.symbol() == m.instrument.symbol)
                .map(|s| Member::new(m.instrument.clone(), s))
        })
        .collect();

    for m in &available {
        if !in_range.iter().any(|r| r.instrument.symbol == m.instrument.symbol) {
            warnings.push(format!(
                "{} has no prices between {} and {}",
                m.instrument.name, range.start, range.end
            ));
        }
    }

    let correlation = CorrelationMatrix::compute(&in_range, config.min_overlap);

    let anchor = config.anchor_date.unwrap_or(range.start);
    let (rebased, rebase_warnings) = rebase_members(&available, anchor, config.rebase_base);
    warnings.extend(rebase_warnings);

    let mut rolling = Vec::with_capacity(available.len());
    for m in &available {
        let series = rebased
            .iter()
            .find(|r| r.symbol() == m.instrument.symbol)
            .map(|r| &r.series)
            .unwrap_or(m.series);
        let full = rolling_returns(series, config.rolling_window)?;
        let trimmed = full.since(range.start);
        if trimmed.is_empty() {
            warnings.push(format!(
                "{} lacks {} trading days of history for rolling returns",
                m.instrument.name, config.rolling_window
            ));
        }
        rolling.push(trimmed);
    }

    tracing::info!(
        "Risk view: {} instruments, {} shared dates",
        correlation.len(),
        correlation.shared_dates
    );

    Ok(RiskReport {
        range,
        correlation,
        rolling,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baskets::get_basket;
    use crate::periods::Period;
    use crate::types::{Category, Cell, PricePoint, Unavailable};
    use approx::assert_abs_diff_eq;
    use chrono::{Datelike, Days, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Weekday series with a deterministic wiggle driven by `seed`.
    fn weekday_series(symbol: &str, start: NaiveDate, end: NaiveDate, seed: f64) -> PriceSeries {
        let mut points = Vec::new();
        let mut date = start;
        let mut close = 50.0 + seed;
        let mut i = 0.0;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                points.push(PricePoint::new(date, close));
                close *= 1.0 + 0.0004 * seed + 0.01 * (i * (0.7 + seed)).sin();
                i += 1.0;
            }
            date = date.checked_add_days(Days::new(1)).unwrap();
        }
        PriceSeries::new(symbol, points).unwrap()
    }

    fn factor_store() -> PriceStore {
        let end = d(2024, 6, 28);
        PriceStore::from_series(vec![
            weekday_series("EUSA", d(2018, 1, 1), end, 1.0),
            weekday_series("URTH", d(2018, 1, 1), end, 2.0),
            weekday_series("MTUM", d(2018, 1, 1), end, 3.0),
            weekday_series("VLUE", d(2018, 1, 1), end, 4.0),
            // Recent listing: ten sessions only
            weekday_series("SIZE", d(2024, 6, 17), end, 5.0),
        ])
    }

    #[test]
    fn test_analyze_basket() {
        let store = factor_store();
        let basket = get_basket("factor").unwrap();
        let range = DateRange::trailing_years(d(2024, 6, 28), 1);

        let report = analyze_basket(&store, basket, &AnalysisConfig::default(), range).unwrap();

        assert_eq!(report.as_of, d(2024, 6, 28));
        assert_eq!(report.anchor, range.start);
        // QUAL, IUSG and USMV have no data
        assert_eq!(report.warnings.iter().filter(|w| w.contains("excluded")).count(), 3);
        // SIZE starts after the anchor
        assert!(report.warnings.iter().any(|w| w.starts_with("USA Size")));
        assert_eq!(report.rebased.len(), 4);

        let bench = report.comparison.benchmark_row().unwrap();
        assert_eq!(bench.symbol(), "EUSA");
        for period in &report.comparison.periods {
            assert_eq!(bench.excess(*period), Cell::Value(0.0));
        }

        let size = report.comparison.row("SIZE").unwrap();
        assert_eq!(
            size.ret(Period::ThreeYears),
            Cell::NotAvailable(Unavailable::InsufficientHistory)
        );
        assert!(size.ret(Period::OneDay).is_available());

        let mtum = report.comparison.row("MTUM").unwrap();
        assert!(mtum.ret(Period::FiveYears).is_available());
    }

    #[test]
    fn test_rebased_and_raw_returns_agree() {
        let store = factor_store();
        let basket = get_basket("factor").unwrap();
        let range = DateRange::trailing_years(d(2024, 6, 28), 1);
        let report = analyze_basket(&store, basket, &AnalysisConfig::default(), range).unwrap();

        let mtum = store.get("MTUM").unwrap();
        let raw = crate::analytics::period_return(mtum, Period::OneYear, report.as_of).unwrap();
        let cell = report.returns.cell("MTUM", Period::OneYear).unwrap();
        assert_abs_diff_eq!(cell.value().unwrap(), raw, epsilon = 1e-9);
    }

    /// Decimal places in the shortest representation of `v`.
    fn decimals(v: f64) -> usize {
        let text = v.to_string();
        text.split_once('.').map_or(0, |(_, frac)| frac.len())
    }

    #[test]
    fn test_rendered_precision() {
        let store = factor_store();
        let range = DateRange::trailing_years(d(2024, 6, 28), 1);
        let config = AnalysisConfig::default();

        let basket = analyze_basket(&store, get_basket("factor").unwrap(), &config, range)
            .unwrap()
            .rounded();
        let json = serde_json::to_value(&basket.comparison).unwrap();
        for row in json["rows"].as_array().unwrap() {
            for cell in row["cells"].as_object().unwrap().values() {
                for key in ["return", "excess"] {
                    if let Some(v) = cell[key]["value"].as_f64() {
                        assert!(decimals(v) <= 1, "{} has more than one decimal", v);
                    }
                }
            }
        }

        let instruments = vec![
            Instrument::new("EUSA", "MSCI USA", Category::Benchmark),
            Instrument::new("MTUM", "USA Momentum", Category::Factor),
        ];
        let risk_range = DateRange::trailing_years(d(2024, 6, 28), 3);
        let risk = analyze_risk(&store, &instruments, &config, risk_range)
            .unwrap()
            .rounded();
        for row in &risk.correlation.values {
            for cell in row {
                assert!(decimals(cell.value().unwrap()) <= 2);
            }
        }
        for series in &risk.rolling {
            assert!(!series.is_empty());
            assert!(series.points.iter().all(|p| decimals(p.value) <= 1));
        }
    }

    #[test]
    fn test_benchmark_override() {
        let store = factor_store();
        let basket = get_basket("factor").unwrap();
        let mut config = AnalysisConfig::default();
        config.benchmarks.insert("factor".to_string(), "URTH".to_string());

        let range = DateRange::trailing_years(d(2024, 6, 28), 1);
        let report = analyze_basket(&store, basket, &config, range).unwrap();
        assert_eq!(report.comparison.benchmark.symbol, "URTH");
        assert!(report.comparison.row("EUSA").is_some());
    }

    #[test]
    fn test_unknown_benchmark_is_fatal() {
        let store = factor_store();
        let basket = get_basket("sector").unwrap();
        let range = DateRange::trailing_years(d(2024, 6, 28), 1);

        let result = analyze_basket(&store, basket, &AnalysisConfig::default(), range);
        assert!(matches!(result, Err(Error::UnknownBenchmark(s)) if s == "VOO"));
    }

    #[test]
    fn test_analyze_risk() {
        let store = factor_store();
        let instruments = vec![
            Instrument::new("EUSA", "MSCI USA", Category::Benchmark),
            Instrument::new("MTUM", "USA Momentum", Category::Factor),
            Instrument::new("VLUE", "USA Value", Category::Factor),
            Instrument::new("QUAL", "USA Quality", Category::Factor),
        ];
        let range = DateRange::trailing_years(d(2024, 6, 28), 3);

        let report = analyze_risk(&store, &instruments, &AnalysisConfig::default(), range).unwrap();

        assert_eq!(report.correlation.len(), 3);
        assert!(report.warnings.iter().any(|w| w.starts_with("USA Quality")));
        for i in 0..3 {
            assert_eq!(report.correlation.values[i][i], Cell::Value(1.0));
        }
        assert_eq!(
            report.correlation.get("MTUM", "VLUE"),
            report.correlation.get("VLUE", "MTUM")
        );

        assert_eq!(report.rolling.len(), 3);
        for rolling in &report.rolling {
            assert!(!rolling.is_empty());
            assert!(rolling.points[0].date >= range.start);
        }
    }

    #[test]
    fn test_risk_short_history_shrinks_sample() {
        let store = factor_store();
        let instruments = vec![
            Instrument::new("EUSA", "MSCI USA", Category::Benchmark),
            Instrument::new("SIZE", "USA Size", Category::Factor),
        ];
        let range = DateRange::trailing_years(d(2024, 6, 28), 3);

        let report = analyze_risk(&store, &instruments, &AnalysisConfig::default(), range).unwrap();
        assert_eq!(report.correlation.shared_dates, 10);
        assert_eq!(report.correlation.observations, 9);
        assert!(!report.correlation.get("EUSA", "SIZE").unwrap().is_available());
        assert!(report.warnings.iter().any(|w| w.contains("rolling")));
    }

    #[test]
    fn test_empty_store_is_fatal() {
        let store = PriceStore::new();
        let range = DateRange::trailing_years(d(2024, 6, 28), 3);
        let result = analyze_risk(&store, &[], &AnalysisConfig::default(), range);
        assert!(matches!(result, Err(Error::EmptyPriceStore)));
    }
}
