//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate:
//! - Total return
//! - Win rate
//! - Profit factor
//! - Max drawdown (amount and percent)
//! - Sharpe ratio
//!
//! [`Metrics`] computes them from a trade log and an equity curve; [`BacktestResult`] is the
//! immutable record a finished run hands back.

use std::fmt;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::PercentCalculus;
use crate::engine::{Backtest, Trade};

/// Summary of a run over an empty candle series.
pub const NO_DATA_SUMMARY: &str = "No data available for backtesting";
/// Summary of a run that never closed a trade.
pub const NO_TRADES_SUMMARY: &str = "No trades executed";

/// Mark-to-market value of the account at one candle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    /// Candle timestamp.
    pub timestamp: DateTime<Utc>,
    /// Realized balance plus unrealized P&L.
    pub equity: f64,
}

impl EquityPoint {
    /// Creates an equity point.
    pub fn new(timestamp: DateTime<Utc>, equity: f64) -> Self {
        Self { timestamp, equity }
    }
}

/// Drawdown state at one equity point.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownPoint {
    /// Highest equity seen so far, starting from the initial balance.
    pub peak: f64,
    /// `peak - equity`.
    pub drawdown: f64,
    /// `drawdown / peak × 100`.
    pub drawdown_percent: f64,
}

/// A collection of trading metrics calculated from a trade log and an equity curve.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone)]
pub struct Metrics {
    initial_balance: f64,
    final_balance: f64,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl From<&Backtest> for Metrics {
    fn from(value: &Backtest) -> Self {
        Self {
            initial_balance: value.initial_balance(),
            final_balance: value.balance(),
            trades: value.trades().to_vec(),
            equity_curve: value.equity_curve().to_vec(),
        }
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance.
    pub fn new(trades: Vec<Trade>, equity_curve: Vec<EquityPoint>, initial_balance: f64, final_balance: f64) -> Self {
        Self {
            initial_balance,
            final_balance,
            trades,
            equity_curve,
        }
    }

    /// Returns the initial balance.
    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Returns the final realized balance.
    pub fn final_balance(&self) -> f64 {
        self.final_balance
    }

    /// Returns the trades.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Returns the equity curve.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Final balance minus initial balance.
    pub fn total_return(&self) -> f64 {
        self.final_balance - self.initial_balance
    }

    /// Total return relative to the initial balance, in percent.
    pub fn total_return_percent(&self) -> f64 {
        self.initial_balance.change(self.final_balance)
    }

    /// Number of closed trades.
    pub fn num_trades(&self) -> usize {
        self.trades.len()
    }

    /// Computes the win rate as a percentage of winning trades.
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }

        let winning_trades = self.trades.iter().filter(|t| t.is_win()).count();
        (winning_trades as f64 / self.trades.len() as f64) * 100.0
    }

    /// Computes the profit factor: gross profit over gross loss.
    ///
    /// `+∞` when trades were made but none lost, `0` without trades.
    pub fn profit_factor(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }

        let mut total_gains = 0.0;
        let mut total_losses = 0.0;

        for trade in &self.trades {
            let pnl = trade.profit_loss();
            if pnl > 0.0 {
                total_gains += pnl;
            } else {
                total_losses += pnl;
            }
        }

        let total_losses = f64::abs(total_losses);
        if total_losses == 0.0 {
            return f64::INFINITY;
        }

        total_gains / total_losses
    }

    /// Running drawdown scan over the equity curve, one point per equity point.
    ///
    /// The peak starts at the initial balance and only ever rises.
    pub fn drawdowns(&self) -> Vec<DrawdownPoint> {
        let mut peak = self.initial_balance;
        self.equity_curve
            .iter()
            .map(|point| {
                peak = peak.max(point.equity);
                let drawdown = peak - point.equity;
                DrawdownPoint {
                    peak,
                    drawdown,
                    drawdown_percent: drawdown / peak * 100.0,
                }
            })
            .collect()
    }

    /// Largest drawdown amount and largest drawdown percent.
    ///
    /// Both are running maxima taken independently over [`Metrics::drawdowns`].
    pub fn max_drawdown(&self) -> (f64, f64) {
        self.drawdowns().iter().fold((0.0, 0.0), |(amount, percent), point| {
            (f64::max(amount, point.drawdown), f64::max(percent, point.drawdown_percent))
        })
    }

    /// Computes the Sharpe ratio of the per-candle equity returns.
    ///
    /// `risk_free_rate` is expressed per candle (e.g., 0.0 for simplicity). `NaN` with fewer than
    /// two equity points.
    pub fn sharpe_ratio(&self, risk_free_rate: f64) -> f64 {
        if self.equity_curve.len() < 2 {
            return f64::NAN;
        }

        let returns = self
            .equity_curve
            .windows(2)
            .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
            .collect::<Vec<_>>();

        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        let std_dev = (returns.iter().map(|r| (r - mean_return).powi(2)).sum::<f64>() / returns.len() as f64).sqrt();

        (mean_return - risk_free_rate) / std_dev
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        if self.trades.is_empty() {
            return NO_TRADES_SUMMARY.to_string();
        }

        let (_, max_drawdown_percent) = self.max_drawdown();
        format!(
            "Total Return: {:.2} ({:.2}%), Trades: {}, Win Rate: {:.2}%, Profit Factor: {:.2}, Max Drawdown: {:.2}%",
            self.total_return(),
            self.total_return_percent(),
            self.num_trades(),
            self.win_rate(),
            self.profit_factor(),
            max_drawdown_percent,
        )
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (max_drawdown, max_drawdown_percent) = self.max_drawdown();
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Initial Balance: {:.2}", self.initial_balance)?;
        writeln!(f, "Final Balance: {:.2}", self.final_balance)?;
        writeln!(f, "Total Return: {:.2} ({:.2}%)", self.total_return(), self.total_return_percent())?;
        writeln!(f)?;
        writeln!(f, "Trades: {}", self.num_trades())?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate())?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor())?;
        writeln!(f, "Max Drawdown: {:.2} ({:.2}%)", max_drawdown, max_drawdown_percent)?;
        write!(f, "Sharpe Ratio (risk-free rate = 0.0): {:.2}", self.sharpe_ratio(0.0))
    }
}

/// Outcome of a backtest run.
///
/// With the `serde` feature an infinite profit factor serializes as `null` in JSON.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Starting cash.
    pub initial_balance: f64,
    /// Realized balance after the last candle.
    pub final_balance: f64,
    /// `final_balance - initial_balance`.
    pub total_return: f64,
    /// Total return in percent of the initial balance.
    pub total_return_percent: f64,
    /// Number of closed trades.
    pub num_trades: usize,
    /// Percentage of trades with a positive P&L.
    pub win_rate: f64,
    /// Gross profit over gross loss.
    pub profit_factor: f64,
    /// Largest peak-to-trough decline of the equity curve.
    pub max_drawdown: f64,
    /// Largest decline in percent of its running peak.
    pub max_drawdown_percent: f64,
    /// Closed trades in chronological order.
    pub trades: Vec<Trade>,
    /// One equity point per candle.
    pub equity_curve: Vec<EquityPoint>,
    /// One-line summary.
    pub summary: String,
}

impl From<Metrics> for BacktestResult {
    fn from(metrics: Metrics) -> Self {
        let (max_drawdown, max_drawdown_percent) = metrics.max_drawdown();
        let summary = metrics.summary();
        let num_trades = metrics.num_trades();

        // rates are reported as zero when nothing traded
        let (win_rate, profit_factor) = if num_trades == 0 {
            (0.0, 0.0)
        } else {
            (metrics.win_rate(), metrics.profit_factor())
        };

        Self {
            initial_balance: metrics.initial_balance,
            final_balance: metrics.final_balance,
            total_return: metrics.total_return(),
            total_return_percent: metrics.total_return_percent(),
            num_trades,
            win_rate,
            profit_factor,
            max_drawdown,
            max_drawdown_percent,
            summary,
            trades: metrics.trades,
            equity_curve: metrics.equity_curve,
        }
    }
}

impl BacktestResult {
    /// Result of a run over an empty candle series.
    pub fn no_data(initial_balance: f64) -> Self {
        Self {
            initial_balance,
            final_balance: initial_balance,
            total_return: 0.0,
            total_return_percent: 0.0,
            num_trades: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            summary: NO_DATA_SUMMARY.to_string(),
        }
    }

    /// Rebuilds the metrics the result was computed from.
    pub fn metrics(&self) -> Metrics {
        Metrics::new(
            self.trades.clone(),
            self.equity_curve.clone(),
            self.initial_balance,
            self.final_balance,
        )
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Result ===")?;
        writeln!(f, "Initial Balance: {:.2}", self.initial_balance)?;
        writeln!(f, "Final Balance: {:.2}", self.final_balance)?;
        writeln!(f, "Total Return: {:.2} ({:.2}%)", self.total_return, self.total_return_percent)?;
        writeln!(f, "Trades: {}", self.num_trades)?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f, "Max Drawdown: {:.2} ({:.2}%)", self.max_drawdown, self.max_drawdown_percent)?;
        writeln!(f)?;
        write!(f, "{}", self.summary)
    }
}
