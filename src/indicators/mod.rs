//! QQE (Quantitative Qualitative Estimation) indicator.
//!
//! The indicator is a pipeline of three stages, each a function over the columns produced by
//! the previous one:
//! - [`momentum`]: RSI, its EMA, the true range of that EMA and the EMA of the true range.
//! - [`bands`]: the sequential trailing-band tracker producing the QQE value.
//! - [`signal`]: zero-line crossings of the re-centered QQE value.
//!
//! Every column is `NaN` before the warm-up index `rsi_period + smoothing_period` and defined
//! from that index on (unless the input has gaps, which propagate as `NaN`).

pub mod bands;
pub mod momentum;
pub mod signal;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::config::QqeConfig;
use crate::errors::{Error, Result};

pub use bands::{BandState, Bands, MIDPOINT, track_bands};
pub use momentum::{Momentum, ema, rsi, smooth_momentum, true_range};
pub use signal::{Signal, detect_signals};

/// Indicator columns aligned 1:1 with the input candles.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    warmup: usize,
    rsi: Vec<f64>,
    smoothed_rsi: Vec<f64>,
    rsi_true_range: Vec<f64>,
    rsi_atr: Vec<f64>,
    fast_band: Vec<f64>,
    slow_band: Vec<f64>,
    qqe_value: Vec<f64>,
    long_band: Vec<f64>,
    short_band: Vec<f64>,
}

impl IndicatorSeries {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.qqe_value.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.qqe_value.is_empty()
    }

    /// First index with defined values.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    /// Raw RSI.
    pub fn rsi(&self) -> &[f64] {
        &self.rsi
    }

    /// EMA of the RSI.
    pub fn smoothed_rsi(&self) -> &[f64] {
        &self.smoothed_rsi
    }

    /// Absolute change of the smoothed RSI.
    pub fn rsi_true_range(&self) -> &[f64] {
        &self.rsi_true_range
    }

    /// EMA of the true range.
    pub fn rsi_atr(&self) -> &[f64] {
        &self.rsi_atr
    }

    /// `rsi_atr × fast_multiplier`.
    pub fn fast_band(&self) -> &[f64] {
        &self.fast_band
    }

    /// `rsi_atr × slow_multiplier`, the width the trailing bands follow.
    pub fn slow_band(&self) -> &[f64] {
        &self.slow_band
    }

    /// QQE value re-centered around zero.
    pub fn qqe_value(&self) -> &[f64] {
        &self.qqe_value
    }

    /// Lower trailing band.
    pub fn long_band(&self) -> &[f64] {
        &self.long_band
    }

    /// Upper trailing band.
    pub fn short_band(&self) -> &[f64] {
        &self.short_band
    }

    /// Zero-line crossing signals, one per row.
    pub fn signals(&self) -> Vec<Signal> {
        detect_signals(&self.qqe_value)
    }
}

/// The QQE indicator with validated parameters.
///
/// Computing is a pure function of the close prices, so one instance can be shared between
/// threads and reused across runs.
///
/// ### Example
/// ```rust
/// use qqe_bts::prelude::*;
///
/// let closes = (0..60).map(|i| 100.0 + (i as f64 * 0.4).sin() * 3.0).collect::<Vec<_>>();
/// let qqe = Qqe::new(QqeConfig::default()).unwrap();
/// let series = qqe.compute(&closes).unwrap();
///
/// assert_eq!(series.len(), 60);
/// assert!(series.qqe_value()[18].is_nan());
/// assert!(!series.qqe_value()[19].is_nan());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Qqe {
    config: QqeConfig,
}

impl Default for Qqe {
    fn default() -> Self {
        Self {
            config: QqeConfig::default(),
        }
    }
}

impl Qqe {
    /// Creates the indicator, rejecting invalid parameters.
    pub fn new(config: QqeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::validated(config))
    }

    /// Wraps parameters that were already validated.
    pub(crate) fn validated(config: QqeConfig) -> Self {
        Self { config }
    }

    /// Returns the parameters.
    pub fn config(&self) -> &QqeConfig {
        &self.config
    }

    /// Number of leading rows without values.
    pub fn warmup(&self) -> usize {
        self.config.warmup()
    }

    /// Computes every indicator column over `closes`.
    ///
    /// ### Errors
    /// [`Error::InsufficientData`] if there are fewer closes than the warm-up length.
    pub fn compute(&self, closes: &[f64]) -> Result<IndicatorSeries> {
        let warmup = self.warmup();
        if closes.len() < warmup {
            return Err(Error::InsufficientData {
                required: warmup,
                available: closes.len(),
            });
        }

        let Momentum {
            mut rsi,
            mut smoothed_rsi,
            mut rsi_true_range,
            mut rsi_atr,
        } = smooth_momentum(closes, self.config.rsi_period, self.config.smoothing_period);

        for column in [&mut rsi, &mut smoothed_rsi, &mut rsi_true_range, &mut rsi_atr] {
            column[..warmup].fill(f64::NAN);
        }

        let fast_band = rsi_atr.iter().map(|atr| atr * self.config.fast_multiplier).collect::<Vec<_>>();
        let slow_band = rsi_atr.iter().map(|atr| atr * self.config.slow_multiplier).collect::<Vec<_>>();

        let Bands {
            qqe_value,
            long_band,
            short_band,
        } = track_bands(&smoothed_rsi, &slow_band, warmup);

        tracing::debug!(rows = closes.len(), warmup, "computed QQE indicator");

        Ok(IndicatorSeries {
            warmup,
            rsi,
            smoothed_rsi,
            rsi_true_range,
            rsi_atr,
            fast_band,
            slow_band,
            qqe_value,
            long_band,
            short_band,
        })
    }
}
