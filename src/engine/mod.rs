//! Core trading engine components.
//!
//! This module provides the fundamental types for backtesting:
//! - `Candle`: OHLCV data for backtesting.
//! - `Position`: the single open trade, and `Trade`, its closed record.
//! - `Wallet`: tracks the realized balance and the unrealized P&L.
//! - `Backtest`: the position state machine driven by QQE signals.

mod candle;
mod position;
mod wallet;

#[cfg(test)]
mod scenarios;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    config::BacktestConfig,
    errors::{Error, Result},
    indicators::{IndicatorSeries, Qqe, Signal},
    metrics::{BacktestResult, EquityPoint, Metrics},
    utils::position_size,
};

pub use candle::*;
pub use position::*;
pub use wallet::*;

/// Backtesting engine for the QQE strategy.
///
/// Holds at most one position at a time. On every candle after the first it marks the open
/// position to market, appends an equity point and then reacts to the signal of that candle:
///
/// | Signal | Position | Transition |
/// |--------|----------|------------|
/// | `Buy`  | none     | open long  |
/// | `Sell` | long     | close      |
/// | `Sell` | none     | open short (if short selling is allowed) |
/// | `Buy`  | short    | close      |
///
/// Every other combination leaves the position unchanged. A position still open after the last
/// candle is closed at its close price.
///
/// The candle data is shared behind an [`Arc`], so any number of backtests can run over the same
/// series on different threads.
#[derive(Debug, Clone)]
pub struct Backtest {
    data: Arc<[Candle]>,
    config: BacktestConfig,
    qqe: Qqe,
    wallet: Wallet,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl std::ops::Deref for Backtest {
    type Target = Wallet;

    fn deref(&self) -> &Self::Target {
        &self.wallet
    }
}

impl Backtest {
    /// Creates a new backtest instance.
    ///
    /// ### Arguments
    /// * `data` - Candles in strictly increasing timestamp order. May be empty.
    /// * `config` - Balance, risk and indicator settings.
    ///
    /// ### Returns
    /// The new backtest instance, or an error if the configuration is invalid or the candles
    /// are out of order.
    pub fn new(data: impl Into<Arc<[Candle]>>, config: BacktestConfig) -> Result<Self> {
        let data = data.into();
        config.validate()?;

        if let Some(index) = data.windows(2).position(|w| w[1].timestamp() <= w[0].timestamp()) {
            return Err(Error::UnorderedCandles { index: index + 1 });
        }

        Ok(Self {
            data,
            config,
            qqe: Qqe::validated(config.qqe),
            wallet: Wallet::funded(config.initial_balance),
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        })
    }

    /// Returns the candles.
    pub fn candles(&self) -> &[Candle] {
        &self.data
    }

    /// Returns the shared candle buffer.
    #[cfg(feature = "optimizer")]
    pub(crate) fn shared_candles(&self) -> &Arc<[Candle]> {
        &self.data
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns the open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns the closed trades.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Returns the equity curve recorded so far.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Computes the QQE indicator over the close prices.
    pub fn indicators(&self) -> Result<IndicatorSeries> {
        let closes = self.data.iter().map(|c| c.close()).collect::<Vec<_>>();
        self.qqe.compute(&closes)
    }

    /// Runs the backtest over every candle.
    ///
    /// An empty series yields [`BacktestResult::no_data`]. State left over from a previous run
    /// is reset first, so repeated runs give identical results.
    ///
    /// ### Errors
    /// [`Error::InsufficientData`] if there are fewer candles than the indicator warm-up, or an
    /// entry/exit price error if a trade would happen at an unusable price.
    pub fn run(&mut self) -> Result<BacktestResult> {
        self.run_inner(None)
    }

    /// Runs the backtest, checking `cancel` after each candle.
    ///
    /// ### Errors
    /// Same as [`Backtest::run`], plus [`Error::Cancelled`] once `cancel` is set. The state of the
    /// partial run stays inspectable until the next run or reset.
    pub fn run_with_cancel(&mut self, cancel: &AtomicBool) -> Result<BacktestResult> {
        self.run_inner(Some(cancel))
    }

    fn run_inner(&mut self, cancel: Option<&AtomicBool>) -> Result<BacktestResult> {
        let span = tracing::info_span!("backtest", candles = self.data.len());
        let _enter = span.enter();

        self.reset();
        if self.data.is_empty() {
            tracing::info!("no candles to backtest");
            return Ok(BacktestResult::no_data(self.initial_balance()));
        }

        let signals = self.indicators()?.signals();
        self.simulate(&signals, cancel)
    }

    /// Drives the position state machine with one signal per candle.
    fn simulate(&mut self, signals: &[Signal], cancel: Option<&AtomicBool>) -> Result<BacktestResult> {
        self.simulate_until(signals, |_| cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)))
    }

    /// Same as [`Backtest::simulate`], stopping once `cancelled` holds after a candle index.
    fn simulate_until(&mut self, signals: &[Signal], cancelled: impl Fn(usize) -> bool) -> Result<BacktestResult> {
        let data = Arc::clone(&self.data);
        let Some(first) = data.first() else {
            return Ok(BacktestResult::no_data(self.initial_balance()));
        };

        self.equity_curve.push(EquityPoint::new(first.timestamp(), self.initial_balance()));

        for (index, candle) in data.iter().enumerate() {
            if index > 0 {
                let signal = signals.get(index).copied().unwrap_or_default();
                self.step(index, candle, signal)?;
            }
            if cancelled(index) {
                tracing::info!(index, "backtest cancelled");
                return Err(Error::Cancelled { index });
            }
        }

        if self.position.is_some() {
            let index = data.len() - 1;
            tracing::debug!(index, "closing position at the end of data");
            self.close_position(index, &data[index])?;
        }

        let result = BacktestResult::from(Metrics::from(&*self));
        tracing::info!(
            final_balance = result.final_balance,
            trades = result.num_trades,
            summary = %result.summary,
            "backtest completed"
        );
        Ok(result)
    }

    /// Marks to market, then applies the transition for `signal`.
    fn step(&mut self, index: usize, candle: &Candle, signal: Signal) -> Result<()> {
        let unrealized_pnl = self.position.map_or(0.0, |p| p.pnl(candle.close()));
        self.wallet.set_unrealized_pnl(unrealized_pnl);
        self.equity_curve
            .push(EquityPoint::new(candle.timestamp(), self.wallet.total_balance()));

        match (signal, self.position.map(|p| p.side())) {
            (Signal::Buy, None) => self.open_position(index, candle, PositionSide::Long),
            (Signal::Sell, Some(PositionSide::Long)) => self.close_position(index, candle),
            (Signal::Sell, None) if self.config.allow_short_selling => {
                self.open_position(index, candle, PositionSide::Short)
            }
            (Signal::Buy, Some(PositionSide::Short)) => self.close_position(index, candle),
            _ => Ok(()),
        }
    }

    /// Opens a position at the candle close, sized from the current balance.
    fn open_position(&mut self, index: usize, candle: &Candle, side: PositionSide) -> Result<()> {
        let price = candle.close();
        if price <= 0.0 || !price.is_finite() {
            return Err(Error::EntryPrice { index, price });
        }

        let size = position_size(self.wallet.balance(), price, self.config.risk_fraction);
        if size <= 0.0 {
            tracing::debug!(index, ?side, price, "position size rounds to zero, not opening");
            return Ok(());
        }

        self.position = Some(Position::new(side, price, size, candle.timestamp()));
        tracing::debug!(index, ?side, price, size, "opened position");
        Ok(())
    }

    /// Closes the open position at the candle close and books the trade.
    fn close_position(&mut self, index: usize, candle: &Candle) -> Result<()> {
        let price = candle.close();
        if !price.is_finite() {
            return Err(Error::ExitPrice { index, price });
        }

        if let Some(position) = self.position.take() {
            let trade = position.close(price, candle.timestamp());
            self.wallet.realize(trade.profit_loss());
            tracing::debug!(
                index,
                side = ?trade.side(),
                price,
                profit_loss = trade.profit_loss(),
                balance = self.wallet.balance(),
                "closed position"
            );
            self.trades.push(trade);
        }
        Ok(())
    }

    /// Resets the backtest to its initial state.
    pub fn reset(&mut self) {
        self.wallet.reset();
        self.position = None;
        self.trades.clear();
        self.equity_curve.clear();
    }
}
