//! Momentum smoothing: RSI, EMA and the true range of the smoothed RSI.
//!
//! All functions return a vector aligned 1:1 with their input, with `NaN` where the value is
//! undefined. A `NaN` input never turns into a number: it propagates to every value that
//! depends on it.

/// Relative strength index with Wilder smoothing.
///
/// Seeded with the mean gain and loss over the first `period` changes, so the first value is at
/// index `period`. `RSI = 100 - 100 / (1 + avg_gain / avg_loss)`, bounded in `[0, 100]`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period + 1 {
        return result;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        avg_gain += gain(change);
        avg_loss += loss(change);
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = relative_strength(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let change = closes[i] - closes[i - 1];
        avg_gain = alpha * gain(change) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss(change) + (1.0 - alpha) * avg_loss;
        result[i] = relative_strength(avg_gain, avg_loss);
    }

    result
}

// NaN changes stay NaN so the averages carry the gap forward.
fn gain(change: f64) -> f64 {
    if change.is_nan() { change } else { change.max(0.0) }
}

fn loss(change: f64) -> f64 {
    if change.is_nan() { change } else { (-change).max(0.0) }
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Exponential moving average, `alpha = 2 / (period + 1)`.
///
/// Leading `NaN`s are skipped; the average is seeded with the first defined value.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    if period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[start];
    result[start] = prev;
    for i in (start + 1)..n {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}

/// Absolute change between consecutive values: `|v[i] - v[i-1]|`.
pub fn true_range(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        result[i] = (values[i] - values[i - 1]).abs();
    }
    result
}

/// The oscillator columns the band tracker runs on.
#[derive(Debug, Clone)]
pub struct Momentum {
    /// Raw oscillator.
    pub rsi: Vec<f64>,
    /// EMA of the oscillator.
    pub smoothed_rsi: Vec<f64>,
    /// True range of the smoothed oscillator.
    pub rsi_true_range: Vec<f64>,
    /// EMA of the true range, the volatility the bands scale with.
    pub rsi_atr: Vec<f64>,
}

/// Runs the RSI → EMA → true range → EMA pipeline over close prices.
pub fn smooth_momentum(closes: &[f64], rsi_period: usize, smoothing_period: usize) -> Momentum {
    let rsi = rsi(closes, rsi_period);
    let smoothed_rsi = ema(&rsi, smoothing_period);
    let rsi_true_range = true_range(&smoothed_rsi);
    let rsi_atr = ema(&rsi_true_range, smoothing_period);

    Momentum {
        rsi,
        smoothed_rsi,
        rsi_true_range,
        rsi_atr,
    }
}
