//! Factorboard Core - Performance and risk analytics for ETF baskets.
//!
//! This crate computes the comparative metrics behind the factorboard views:
//!
//! - **Rebasing**: normalize price histories to a common index value
//! - **Period returns**: 1D through 5Y, plus week/month/quarter/year to date
//! - **Benchmark comparison**: excess returns, rankings, benchmark ordering
//! - **Correlation**: pairwise Pearson matrix of daily returns
//! - **Rolling returns**: trailing fixed-window performance series
//!
//! Every computation is a pure function over an immutable [`PriceStore`].
//! Cells that cannot be computed are tagged [`Cell::NotAvailable`] rather than
//! being dropped or zeroed.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use factorboard_core::{period_return, Period, PricePoint, PriceSeries};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
//! let series = PriceSeries::new(
//!     "MTUM",
//!     vec![
//!         PricePoint::new(day(4), 100.0),
//!         PricePoint::new(day(5), 102.0),
//!         PricePoint::new(day(6), 105.0),
//!         PricePoint::new(day(7), 103.0),
//!     ],
//! )
//! .unwrap();
//!
//! let one_day = period_return(&series, Period::OneDay, day(7)).unwrap();
//! assert!((one_day - (103.0 / 105.0 - 1.0) * 100.0).abs() < 1e-9);
//! ```

pub mod analysis;
pub mod analytics;
pub mod baskets;
pub mod cache;
pub mod config;
pub mod periods;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use types::{
    round_to, ApiResponse, Category, Cell, DateRange, Instrument, PricePoint, PriceSeries, Unavailable,
};

// Re-export main functionality
pub use analysis::{analyze_basket, analyze_risk, BasketReport, RiskReport};
pub use analytics::{
    correlate_returns, daily_returns, period_return, rebase, rolling_returns, ComparisonTable,
    CorrelationMatrix, RebasedSeries, ReturnTable, RollingSeries,
};
pub use baskets::{builtin_baskets, get_basket, risk_universe, Basket, Member, ResolvedBasket, BUILTIN_BASKETS};
pub use cache::{CacheKey, PriceCache};
pub use config::AnalysisConfig;
pub use periods::Period;
pub use store::{JsonFileSource, PriceSource, PriceStore};

/// Error types for factorboard-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("Price series for {0} has no observations")]
    EmptySeries(String),

    #[error("Price store is empty")]
    EmptyPriceStore,

    #[error("Unknown benchmark: {0}")]
    UnknownBenchmark(String),

    #[error("Unknown basket: {0}")]
    UnknownBasket(String),

    #[error("No observation for {symbol} on or before anchor date {anchor}")]
    MissingAnchor {
        symbol: String,
        anchor: chrono::NaiveDate,
    },

    #[error("History for {symbol} does not reach back to {required}")]
    InsufficientHistory {
        symbol: String,
        required: chrono::NaiveDate,
    },

    #[error("Last close for {symbol} is {last}, too old for as-of date {as_of}")]
    StalePrice {
        symbol: String,
        last: chrono::NaiveDate,
        as_of: chrono::NaiveDate,
    },

    #[error("Only {found} shared dates, need at least {required}")]
    InsufficientOverlap { found: usize, required: usize },

    #[error("Return series are not aligned: {left} vs {right} observations")]
    MisalignedReturns { left: usize, right: usize },
}

/// Result type for factorboard-core operations.
pub type Result<T> = std::result::Result<T, Error>;
