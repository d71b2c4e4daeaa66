//! Indicator and backtest settings.
//!
//! Both structs deserialize from partial documents (missing keys fall back to the defaults), so a
//! TOML file only needs the values it changes:
//!
//! ```toml
//! initial_balance = 5000.0
//! allow_short_selling = false
//!
//! [qqe]
//! rsi_period = 21
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Parameters of the QQE indicator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QqeConfig {
    /// Period of the relative strength oscillator.
    pub rsi_period: usize,
    /// Period of the EMAs applied to the oscillator and to its true range.
    pub smoothing_period: usize,
    /// Multiplier of the fast band.
    pub fast_multiplier: f64,
    /// Multiplier of the slow band, the one the trailing bands follow.
    pub slow_multiplier: f64,
}

impl Default for QqeConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            smoothing_period: 5,
            fast_multiplier: 2.618,
            slow_multiplier: 4.236,
        }
    }
}

impl QqeConfig {
    /// Sets the oscillator period.
    pub fn rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    /// Sets the smoothing period.
    pub fn smoothing_period(mut self, period: usize) -> Self {
        self.smoothing_period = period;
        self
    }

    /// Sets the fast band multiplier.
    pub fn fast_multiplier(mut self, multiplier: f64) -> Self {
        self.fast_multiplier = multiplier;
        self
    }

    /// Sets the slow band multiplier.
    pub fn slow_multiplier(mut self, multiplier: f64) -> Self {
        self.slow_multiplier = multiplier;
        self
    }

    /// Number of leading candles without indicator values.
    pub fn warmup(&self) -> usize {
        self.rsi_period + self.smoothing_period
    }

    /// Rejects zero periods and non-positive multipliers.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("rsi_period", self.rsi_period), ("smoothing_period", self.smoothing_period)] {
            if value == 0 {
                return Err(Error::NegZeroPeriod { name, value });
            }
        }
        for (name, value) in [
            ("fast_multiplier", self.fast_multiplier),
            ("slow_multiplier", self.slow_multiplier),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(Error::NegZeroMultiplier { name, value });
            }
        }
        Ok(())
    }
}

/// Settings of a backtest run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    /// Starting cash.
    pub initial_balance: f64,
    /// Fraction of the current balance committed to each new position (e.g. 0.01 for 1%).
    pub risk_fraction: f64,
    /// Whether a sell signal without an open position opens a short.
    pub allow_short_selling: bool,
    /// Indicator parameters.
    pub qqe: QqeConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1_000.0,
            risk_fraction: 0.01,
            allow_short_selling: true,
            qqe: QqeConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Sets the initial balance.
    pub fn initial_balance(mut self, balance: f64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// Sets the risk fraction.
    pub fn risk_fraction(mut self, fraction: f64) -> Self {
        self.risk_fraction = fraction;
        self
    }

    /// Enables or disables short selling.
    pub fn allow_short_selling(mut self, allow: bool) -> Self {
        self.allow_short_selling = allow;
        self
    }

    /// Sets the indicator parameters.
    pub fn qqe(mut self, qqe: QqeConfig) -> Self {
        self.qqe = qqe;
        self
    }

    /// Validates every setting.
    pub fn validate(&self) -> Result<()> {
        if self.initial_balance <= 0.0 || !self.initial_balance.is_finite() {
            return Err(Error::NegZeroBalance(self.initial_balance));
        }
        if self.risk_fraction < 0.0 || !self.risk_fraction.is_finite() {
            return Err(Error::NegRiskFraction(self.risk_fraction));
        }
        self.qqe.validate()
    }
}
