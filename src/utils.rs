//! Position sizing and data loading helpers.

#[cfg(feature = "serde")]
use crate::{engine::Candle, errors::Result};

/// Decimal places kept on a position size.
pub const SIZE_DECIMALS: i32 = 6;

/// Rounds `value` toward negative infinity at `decimals` places.
pub fn truncate(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).floor() / factor
}

/// Size in asset units of a position committing `risk_fraction` of `balance` at `price`.
///
/// The result is floored to [`SIZE_DECIMALS`] places and can be zero.
pub fn position_size(balance: f64, price: f64, risk_fraction: f64) -> f64 {
    let size = truncate(balance * risk_fraction / price, SIZE_DECIMALS);
    tracing::debug!(balance, price, risk_fraction, size, "position sizing");
    size
}

#[cfg(feature = "serde")]
/// Reads a JSON array of candles from `path`.
///
/// Order is preserved as is; the engine rejects series whose timestamps are not strictly
/// increasing.
pub fn load_candles(path: impl AsRef<std::path::Path>) -> Result<Vec<Candle>> {
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

#[cfg(test)]
#[test]
fn truncate_floors() {
    assert_eq!(truncate(0.1234567, 6), 0.123456);
    assert_eq!(truncate(0.1234569, 6), 0.123456);
    assert_eq!(truncate(2.0, 6), 2.0);
    assert_eq!(truncate(1.99, 0), 1.0);
}

#[cfg(test)]
#[test]
fn size_from_risk() {
    assert_eq!(position_size(1_000.0, 100.0, 0.01), 0.1);
    assert_eq!(position_size(1_000.0, 3.0, 0.01), 3.333333);
    assert_eq!(position_size(1_000.0, 100.0, 0.0), 0.0);
    // too small to hold a single unit of the last decimal
    assert_eq!(position_size(1.0, 10_000_000.0, 0.01), 0.0);
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn load_candles_from_file() {
    let path = std::env::temp_dir().join(format!("qqe-bts-candles-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[
            { "timestamp": 1700000000000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0 },
            { "open_time": 1700000060000, "open_price": 1.5, "high_price": 2.5, "low_price": 1.0, "close_price": 2.0, "volume": 0.0 }
        ]"#,
    )
    .unwrap();

    let candles = load_candles(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].close(), 1.5);
    assert_eq!(candles[1].close(), 2.0);
    assert_eq!(candles[1].timestamp().timestamp_millis(), 1_700_000_060_000);
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn load_candles_missing_file() {
    let result = load_candles("/nonexistent/qqe-bts/candles.json");
    assert!(matches!(result, Err(crate::errors::Error::IoError(_))));
}
