//! Adaptive trailing bands of the QQE.
//!
//! The tracker walks the smoothed RSI once, carrying a [`BandState`] from one index to the
//! next. Each band trails the oscillator like a trailing stop trails price: it only moves in
//! the favorable direction until the oscillator crosses it, then resets around the oscillator.

/// Level the QQE value is re-centered on, so that crossings of zero are the signals.
pub const MIDPOINT: f64 = 50.0;

/// QQE value and trailing bands at one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandState {
    /// Running estimate, bounded by the two bands.
    pub qqe_value: f64,
    /// Lower trailing band.
    pub long_band: f64,
    /// Upper trailing band.
    pub short_band: f64,
}

impl BandState {
    const UNDEFINED: Self = Self {
        qqe_value: f64::NAN,
        long_band: f64::NAN,
        short_band: f64::NAN,
    };

    /// State at the first index past warm-up.
    pub fn seed(rsi: f64, slow_band: f64) -> Self {
        if rsi.is_nan() || slow_band.is_nan() {
            return Self::UNDEFINED;
        }
        Self {
            qqe_value: rsi,
            long_band: rsi - slow_band,
            short_band: rsi + slow_band,
        }
    }

    /// Advances the state by one index.
    ///
    /// There is no tolerance on any comparison, and the branch order of the value update is
    /// significant: the upper flip is tested before the lower one. An undefined input yields an
    /// undefined state, and an undefined state never becomes defined again.
    pub fn next(self, rsi: f64, slow_band: f64) -> Self {
        if rsi.is_nan() || slow_band.is_nan() {
            return Self::UNDEFINED;
        }

        let Self {
            qqe_value: prev_qqe,
            long_band: prev_long,
            short_band: prev_short,
        } = self;

        let long_band = if prev_qqe > prev_long && rsi > prev_long {
            prev_long.max(rsi - slow_band)
        } else {
            rsi - slow_band
        };

        let short_band = if prev_qqe < prev_short && rsi < prev_short {
            prev_short.min(rsi + slow_band)
        } else {
            rsi + slow_band
        };

        let qqe_value = if prev_qqe > prev_short && rsi > short_band {
            short_band
        } else if prev_qqe < prev_long && rsi < long_band {
            long_band
        } else if rsi > prev_qqe && rsi > long_band {
            long_band
        } else if rsi < prev_qqe && rsi < short_band {
            short_band
        } else {
            prev_qqe
        };

        Self {
            qqe_value,
            long_band,
            short_band,
        }
    }
}

/// Output columns of the tracker.
#[derive(Debug, Clone)]
pub struct Bands {
    /// QQE value re-centered around zero.
    pub qqe_value: Vec<f64>,
    /// Lower trailing band (not re-centered).
    pub long_band: Vec<f64>,
    /// Upper trailing band (not re-centered).
    pub short_band: Vec<f64>,
}

/// Runs the tracker from index `start` to the end of the series.
///
/// Indices before `start` are `NaN`. The state is seeded at `start` and advanced with
/// [`BandState::next`]; once the scan is done the QQE value is shifted down by [`MIDPOINT`].
pub fn track_bands(smoothed_rsi: &[f64], slow_band: &[f64], start: usize) -> Bands {
    let n = smoothed_rsi.len().min(slow_band.len());
    let mut bands = Bands {
        qqe_value: vec![f64::NAN; n],
        long_band: vec![f64::NAN; n],
        short_band: vec![f64::NAN; n],
    };

    let mut state: Option<BandState> = None;
    for i in start..n {
        let next = match state {
            None => BandState::seed(smoothed_rsi[i], slow_band[i]),
            Some(prev) => prev.next(smoothed_rsi[i], slow_band[i]),
        };
        bands.qqe_value[i] = next.qqe_value;
        bands.long_band[i] = next.long_band;
        bands.short_band[i] = next.short_band;
        state = Some(next);
    }

    for value in bands.qqe_value.iter_mut() {
        *value -= MIDPOINT;
    }

    bands
}
