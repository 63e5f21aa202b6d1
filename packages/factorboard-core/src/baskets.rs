//! Built-in instrument baskets and basket resolution against a price store.

use crate::store::PriceStore;
use crate::types::{Category, Instrument, PriceSeries};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// A named set of instruments compared against a benchmark.
#[derive(Debug, Clone, Serialize)]
pub struct Basket {
    /// Basket identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Instruments compared against the benchmark
    pub members: Vec<Instrument>,
    /// Benchmark instrument (not repeated in `members`)
    pub benchmark: Instrument,
}

impl Basket {
    /// Return a copy of the basket using a different benchmark.
    ///
    /// If the new benchmark is a member it is moved out of the member list and
    /// the previous benchmark takes its place as a regular member.
    pub fn with_benchmark(&self, symbol: &str) -> Basket {
        let symbol = symbol.trim().to_uppercase();
        if symbol == self.benchmark.symbol {
            return self.clone();
        }

        let mut members = self.members.clone();
        let benchmark = match members.iter().position(|m| m.symbol == symbol) {
            Some(idx) => members.remove(idx),
            None => Instrument::new(&symbol, &symbol, Category::Benchmark),
        };
        members.push(self.benchmark.clone());

        Basket {
            id: self.id.clone(),
            name: self.name.clone(),
            members,
            benchmark,
        }
    }

    /// Bind the basket to the series available in `store`.
    ///
    /// Members without data are excluded with a warning. An empty store or a
    /// benchmark without data fails the whole request.
    pub fn resolve<'a>(&self, store: &'a PriceStore) -> Result<ResolvedBasket<'a>> {
        if store.is_empty() {
            return Err(Error::EmptyPriceStore);
        }

        let benchmark_series = store
            .get(&self.benchmark.symbol)
            .ok_or_else(|| Error::UnknownBenchmark(self.benchmark.symbol.clone()))?;

        let mut members = Vec::with_capacity(self.members.len());
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(self.benchmark.symbol.as_str());

        for instrument in &self.members {
            if !seen.insert(instrument.symbol.as_str()) {
                continue;
            }
            match store.get(&instrument.symbol) {
                Some(series) => members.push(Member::new(instrument.clone(), series)),
                None => {
                    let e = Error::EmptySeries(instrument.symbol.clone());
                    tracing::warn!("Excluding {} from {} basket: {}", instrument.symbol, self.id, e);
                    warnings.push(format!("{} excluded: {}", instrument.name, e));
                }
            }
        }

        Ok(ResolvedBasket {
            id: self.id.clone(),
            name: self.name.clone(),
            benchmark: Member::new(self.benchmark.clone(), benchmark_series),
            members,
            warnings,
        })
    }
}

/// An instrument paired with its price series.
#[derive(Debug, Clone)]
pub struct Member<'a> {
    pub instrument: Instrument,
    pub series: &'a PriceSeries,
}

impl<'a> Member<'a> {
    pub fn new(instrument: Instrument, series: &'a PriceSeries) -> Self {
        Self { instrument, series }
    }
}

/// A basket bound to price data.
#[derive(Debug, Clone)]
pub struct ResolvedBasket<'a> {
    pub id: String,
    pub name: String,
    pub benchmark: Member<'a>,
    pub members: Vec<Member<'a>>,
    /// Instruments excluded for lack of data
    pub warnings: Vec<String>,
}

impl<'a> ResolvedBasket<'a> {
    /// Members followed by the benchmark.
    pub fn all(&self) -> Vec<Member<'a>> {
        let mut all = self.members.clone();
        all.push(self.benchmark.clone());
        all
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.members
            .iter()
            .chain(std::iter::once(&self.benchmark))
            .map(|m| m.instrument.symbol.as_str())
            .collect()
    }
}

fn basket(id: &str, name: &str, benchmark: (&str, &str), members: &[(&str, &str)], category: Category) -> Basket {
    Basket {
        id: id.to_string(),
        name: name.to_string(),
        members: members
            .iter()
            .map(|(symbol, name)| Instrument::new(symbol, name, category))
            .collect(),
        benchmark: Instrument::new(benchmark.0, benchmark.1, Category::Benchmark),
    }
}

/// Built-in baskets, all US-listed and USD-denominated.
pub static BUILTIN_BASKETS: LazyLock<BTreeMap<String, Basket>> = LazyLock::new(|| {
    let mut baskets = BTreeMap::new();

    baskets.insert(
        "factor".to_string(),
        basket(
            "factor",
            "Factor",
            ("EUSA", "MSCI USA (US Benchmark)"),
            &[
                ("URTH", "MSCI World (Global Benchmark)"),
                ("MTUM", "USA Momentum"),
                ("VLUE", "USA Value"),
                ("QUAL", "USA Quality"),
                ("IUSG", "USA Growth"),
                ("USMV", "USA Low Volatility"),
                ("SIZE", "USA Size"),
            ],
            Category::Factor,
        ),
    );

    baskets.insert(
        "region".to_string(),
        basket(
            "region",
            "Regional",
            ("URTH", "MSCI World (Benchmark)"),
            &[
                ("VOO", "USA (S&P 500)"),
                ("EWJ", "Japan"),
                ("EWU", "UK"),
                ("EZU", "Europe ex-UK"),
                ("EMXC", "Emerging Markets ex-China"),
                ("MCHI", "China"),
                ("EWC", "Canada"),
            ],
            Category::Region,
        ),
    );

    baskets.insert(
        "sector".to_string(),
        basket(
            "sector",
            "Sector",
            ("VOO", "S&P 500 (US Benchmark)"),
            &[
                ("VGT", "Info. Technology"),
                ("VHT", "Health Care"),
                ("VFH", "Financials"),
                ("VCR", "Cons. Discretionary"),
                ("VIS", "Industrials"),
                ("VDC", "Cons. Staples"),
                ("VDE", "Energy"),
                ("VPU", "Utilities"),
                ("VAW", "Materials"),
                ("VNQ", "Real Estate"),
                ("VOX", "Communication Svcs"),
            ],
            Category::Sector,
        ),
    );

    baskets
});

/// Get a built-in basket by id.
pub fn get_basket(id: &str) -> Result<&'static Basket> {
    BUILTIN_BASKETS
        .get(&id.trim().to_lowercase())
        .ok_or_else(|| Error::UnknownBasket(id.to_string()))
}

/// List all built-in baskets.
pub fn builtin_baskets() -> Vec<&'static Basket> {
    BUILTIN_BASKETS.values().collect()
}

/// Every instrument across the built-in baskets, first occurrence wins.
///
/// This is the universe of the risk and correlation view.
pub fn risk_universe() -> Vec<Instrument> {
    let mut seen = HashSet::new();
    let mut universe = Vec::new();

    for id in ["factor", "region", "sector"] {
        if let Some(b) = BUILTIN_BASKETS.get(id) {
            for inst in std::iter::once(&b.benchmark).chain(b.members.iter()) {
                if seen.insert(inst.symbol.clone()) {
                    universe.push(inst.clone());
                }
            }
        }
    }

    universe
}
