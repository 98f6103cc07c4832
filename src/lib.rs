//! Pairs-trading statistical-arbitrage backtester.
//!
//! Three stages over a table of closing prices:
//! 1. [`selection::select_pairs`] scans every unordered asset pair and keeps
//!    the ones whose hedged log-spread tests as mean-reverting.
//! 2. [`signals::compute_returns`] runs the z-score threshold strategy for
//!    one pair and parameter set, with a one-period execution delay.
//! 3. [`optimizer::optimize`] grid-searches strategy parameters per pair and
//!    reports the best combination by cumulative return.

pub mod data;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod performance;
pub mod selection;
pub mod signals;
pub mod stats;

pub use error::EngineError;
pub use models::{OptimizationResult, Pair, ParameterSet, PriceTable, ReturnSeries};
pub use optimizer::{optimize, ParameterGrid};
pub use selection::select_pairs;
pub use signals::compute_returns;
