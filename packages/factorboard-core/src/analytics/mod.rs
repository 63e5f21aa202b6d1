//! Performance and risk computations.
//!
//! All functions here are pure: they read price series and return derived
//! values without holding state between calls.

mod comparison;
mod correlation;
mod rebase;
mod returns;
mod rolling;

pub use comparison::{ComparisonCell, ComparisonRow, ComparisonTable};
pub use correlation::{correlate_returns, daily_returns, pearson, CorrelationMatrix, DEFAULT_MIN_OVERLAP};
pub use rebase::{rebase, rebase_members, rebase_to, RebasedSeries, DEFAULT_BASE};
pub use returns::{period_return, return_row, ReturnRow, ReturnTable};
pub use rolling::{rolling_returns, RollingPoint, RollingSeries, DEFAULT_WINDOW};
