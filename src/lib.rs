//! # QQE-BTS: Backtest of the QQE signal indicator
//!
//! **QQE-BTS** turns a time-ordered sequence of candles into trading signals with the QQE
//! (Quantitative Qualitative Estimation) indicator and measures how trading those signals would
//! have performed.
//!
//! ## Pipeline
//! | Stage | Description |
//! |-------|-------------|
//! | **Momentum smoother** | RSI, its EMA, and the EMA of the smoothed RSI's true range. |
//! | **Adaptive band tracker** | Trailing bands around the smoothed RSI producing the QQE value. |
//! | **Signal detector** | `Buy`/`Sell` on zero-line crossings of the re-centered QQE value. |
//! | **Position state machine** | At most one long or short position, sized from a risk fraction. |
//! | **Performance aggregator** | Equity curve, win rate, profit factor and drawdown. |
//!
//! Every stage is a pure function of the one before it except the position state machine, which
//! carries the wallet and the open position across candles.
//!
//! ## Getting Started
//! ```rust
//! use qqe_bts::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let start = DateTime::from_timestamp_secs(1515151515).unwrap();
//! let candles = (0..200)
//!     .map(|i| {
//!         let close = 100.0 + 10.0 * (i as f64 * 0.15).sin();
//!         CandleBuilder::builder()
//!             .timestamp(start + Duration::hours(i))
//!             .open(close)
//!             .high(close + 0.5)
//!             .low(close - 0.5)
//!             .close(close)
//!             .build()
//!             .unwrap()
//!     })
//!     .collect::<Vec<_>>();
//!
//! let config = BacktestConfig::default().initial_balance(10_000.0).risk_fraction(0.02);
//! let mut backtest = Backtest::new(candles, config).unwrap();
//! let result = backtest.run().unwrap();
//!
//! assert_eq!(result.equity_curve.len(), 200);
//! println!("{result}");
//! ```
//!
//! ## Features
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` *(default)* | Serialize results, deserialize candles and configuration. |
//! | `optimizer` | Parallel parameter sweep with [`rayon`](https://crates.io/crates/rayon). |
//! | `cli` | The `qqe-bts` command-line runner. |
//!
//! ## Error Handling
//! Configuration is validated up front and every fallible operation returns
//! [`errors::Result`]. An empty candle series is not an error: it yields a result whose summary
//! says there was no data.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Indicator and backtest settings.
pub mod config;

/// Core trading engine components: candles, positions, wallet, and backtest logic.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// The QQE indicator: momentum smoothing, trailing bands and signals.
pub mod indicators;

/// Performance metrics: drawdown, profit factor, win rate, etc.
pub mod metrics;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Position sizing and data loading.
pub mod utils;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::PercentCalculus;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::indicators::{IndicatorSeries, Qqe, Signal};
    pub use crate::metrics::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}

use std::ops::{Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Rhs) -> Self;
}

impl PercentCalculus for f64 {
    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}
