//! Benchmark-relative comparison of period returns.

use super::returns::ReturnTable;
use crate::periods::Period;
use crate::types::{Cell, Instrument, Unavailable};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Own return and excess return over the benchmark for one period.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ComparisonCell {
    #[serde(rename = "return")]
    pub ret: Cell,
    pub excess: Cell,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub instrument: Instrument,
    pub is_benchmark: bool,
    pub cells: BTreeMap<Period, ComparisonCell>,
}

impl ComparisonRow {
    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    pub fn ret(&self, period: Period) -> Cell {
        self.cells
            .get(&period)
            .map(|c| c.ret)
            .unwrap_or(Cell::NotAvailable(Unavailable::InsufficientHistory))
    }

    pub fn excess(&self, period: Period) -> Cell {
        self.cells
            .get(&period)
            .map(|c| c.excess)
            .unwrap_or(Cell::NotAvailable(Unavailable::InsufficientHistory))
    }
}

/// Return table with an excess-return column per period.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    pub as_of: NaiveDate,
    pub benchmark: Instrument,
    pub periods: Vec<Period>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Build from a return table that contains the benchmark's row.
    ///
    /// The benchmark row's excess is 0 by definition. Other rows get
    /// `NotAvailable` excess wherever either side's return is unavailable.
    pub fn build(table: &ReturnTable, benchmark: &str) -> Result<Self> {
        let bench_row = table
            .row(benchmark)
            .ok_or_else(|| Error::UnknownBenchmark(benchmark.to_string()))?;
        let bench_symbol = bench_row.instrument.symbol.clone();

        let rows = table
            .rows
            .iter()
            .map(|row| {
                let is_benchmark = row.instrument.symbol == bench_symbol;
                let cells = table
                    .periods
                    .iter()
                    .map(|&period| {
                        let ret = row
                            .cells
                            .get(&period)
                            .copied()
                            .unwrap_or(Cell::NotAvailable(Unavailable::InsufficientHistory));
                        let excess = if is_benchmark {
                            Cell::Value(0.0)
                        } else {
                            match (ret, bench_row.cells.get(&period)) {
                                (Cell::Value(r), Some(Cell::Value(b))) => Cell::Value(r - b),
                                (Cell::NotAvailable(reason), _) => Cell::NotAvailable(reason),
                                _ => Cell::NotAvailable(Unavailable::NoBenchmark),
                            }
                        };
                        (period, ComparisonCell { ret, excess })
                    })
                    .collect();

                ComparisonRow {
                    instrument: row.instrument.clone(),
                    is_benchmark,
                    cells,
                }
            })
            .collect();

        Ok(Self {
            as_of: table.as_of,
            benchmark: bench_row.instrument.clone(),
            periods: table.periods.clone(),
            rows,
        })
    }

    pub fn row(&self, symbol: &str) -> Option<&ComparisonRow> {
        let symbol = symbol.trim().to_uppercase();
        self.rows.iter().find(|r| r.instrument.symbol == symbol)
    }

    /// Copy with every return and excess rounded to `decimals` places.
    ///
    /// Rank and order on the unrounded table; rounding can create ties.
    pub fn rounded(&self, decimals: u32) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| ComparisonRow {
                instrument: row.instrument.clone(),
                is_benchmark: row.is_benchmark,
                cells: row
                    .cells
                    .iter()
                    .map(|(p, c)| {
                        let cell = ComparisonCell {
                            ret: c.ret.rounded(decimals),
                            excess: c.excess.rounded(decimals),
                        };
                        (*p, cell)
                    })
                    .collect(),
            })
            .collect();

        Self {
            as_of: self.as_of,
            benchmark: self.benchmark.clone(),
            periods: self.periods.clone(),
            rows,
        }
    }

    pub fn benchmark_row(&self) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.is_benchmark)
    }

    /// Rows sorted best to worst by return for `period`.
    ///
    /// Ties are broken by symbol; unavailable cells sort last.
    pub fn ranked(&self, period: Period) -> Vec<&ComparisonRow> {
        let mut rows: Vec<&ComparisonRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            compare_desc(a.ret(period), b.ret(period)).then_with(|| a.symbol().cmp(b.symbol()))
        });
        rows
    }

    pub fn best(&self, period: Period) -> Option<&ComparisonRow> {
        self.ranked(period)
            .into_iter()
            .find(|r| r.ret(period).is_available())
    }

    pub fn worst(&self, period: Period) -> Option<&ComparisonRow> {
        self.ranked(period)
            .into_iter()
            .rev()
            .find(|r| r.ret(period).is_available())
    }

    /// Outperformers (best first), then the benchmark, then everything else.
    ///
    /// Rows level with the benchmark go below it.
    pub fn ordered_around_benchmark(&self, period: Period) -> Vec<&ComparisonRow> {
        let bench_value = self.benchmark_row().and_then(|r| r.ret(period).value());
        let mut above = Vec::new();
        let mut bench = Vec::new();
        let mut below = Vec::new();

        for row in self.ranked(period) {
            if row.is_benchmark {
                bench.push(row);
                continue;
            }
            match (row.ret(period).value(), bench_value) {
                (Some(v), Some(b)) if v > b => above.push(row),
                _ => below.push(row),
            }
        }

        above.into_iter().chain(bench).chain(below).collect()
    }

    /// Excess return scaled per column into [-1, 1].
    ///
    /// Positive excess is divided by the column's largest positive excess and
    /// negative excess by the largest negative magnitude, so the strongest
    /// out- and underperformers map to 1 and -1.
    pub fn excess_intensity(&self, period: Period) -> Vec<(String, Cell)> {
        let excesses: Vec<f64> = self
            .rows
            .iter()
            .filter(|r| !r.is_benchmark)
            .filter_map(|r| r.excess(period).value())
            .collect();

        let max_pos = excesses.iter().copied().filter(|e| *e > 0.0).fold(0.0, f64::max);
        let max_neg = excesses
            .iter()
            .copied()
            .filter(|e| *e < 0.0)
            .map(f64::abs)
            .fold(0.0, f64::max);

        self.rows
            .iter()
            .map(|row| {
                let cell = match row.excess(period) {
                    _ if row.is_benchmark => Cell::Value(0.0),
                    Cell::Value(e) if e > 0.0 => Cell::Value((e / max_pos).min(1.0)),
                    Cell::Value(e) if e < 0.0 => Cell::Value((e / max_neg).max(-1.0)),
                    Cell::Value(_) => Cell::Value(0.0),
                    na => na,
                };
                (row.instrument.symbol.clone(), cell)
            })
            .collect()
    }
}

fn compare_desc(a: Cell, b: Cell) -> Ordering {
    match (a.value(), b.value()) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
