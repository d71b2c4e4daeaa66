//! Zero-line crossings of the QQE value.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trading signal emitted at one candle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    /// Nothing to do.
    #[default]
    None,
    /// The QQE value crossed above zero.
    Buy,
    /// The QQE value crossed below zero.
    Sell,
}

impl Signal {
    /// Classifies the move of the re-centered QQE value from `prev` to `current`.
    ///
    /// `Buy` on `prev <= 0 < current`, `Sell` on `prev >= 0 > current`. Any `NaN` yields `None`.
    pub fn crossing(prev: f64, current: f64) -> Self {
        if prev <= 0.0 && current > 0.0 {
            Self::Buy
        } else if prev >= 0.0 && current < 0.0 {
            Self::Sell
        } else {
            Self::None
        }
    }
}

/// Zero-line crossings of the re-centered QQE value, one signal per index.
///
/// Index 0 never has a signal.
pub fn detect_signals(qqe_value: &[f64]) -> Vec<Signal> {
    let mut signals = vec![Signal::None; qqe_value.len()];
    for i in 1..qqe_value.len() {
        signals[i] = Signal::crossing(qqe_value[i - 1], qqe_value[i]);
    }
    signals
}

#[cfg(test)]
#[test]
fn crossings() {
    assert_eq!(Signal::crossing(-1.0, 2.0), Signal::Buy);
    assert_eq!(Signal::crossing(0.0, 0.5), Signal::Buy);
    assert_eq!(Signal::crossing(3.0, -0.1), Signal::Sell);
    assert_eq!(Signal::crossing(0.0, -5.0), Signal::Sell);
    assert_eq!(Signal::crossing(1.0, 2.0), Signal::None);
    assert_eq!(Signal::crossing(-1.0, -2.0), Signal::None);
    assert_eq!(Signal::crossing(1.0, 0.0), Signal::None);
    assert_eq!(Signal::crossing(-1.0, 0.0), Signal::None);
    assert_eq!(Signal::crossing(0.0, 0.0), Signal::None);
}

#[cfg(test)]
#[test]
fn undefined_values_never_signal() {
    assert_eq!(Signal::crossing(f64::NAN, 5.0), Signal::None);
    assert_eq!(Signal::crossing(-5.0, f64::NAN), Signal::None);
    assert_eq!(Signal::crossing(f64::NAN, f64::NAN), Signal::None);
}

#[cfg(test)]
#[test]
fn detect_over_series() {
    let mut qqe = vec![f64::NAN; 19];
    qqe.extend([10.0, 10.0, 10.0, -5.0, -5.0, 3.0]);

    let signals = detect_signals(&qqe);
    assert_eq!(signals.len(), qqe.len());
    assert!(signals[..=21].iter().all(|s| *s == Signal::None));
    assert_eq!(signals[22], Signal::Sell);
    assert_eq!(signals[23], Signal::None);
    assert_eq!(signals[24], Signal::Buy);
}

#[cfg(test)]
#[test]
fn detect_empty() {
    assert!(detect_signals(&[]).is_empty());
    assert_eq!(detect_signals(&[1.0]), vec![Signal::None]);
}
