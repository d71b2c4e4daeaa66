use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use chrono::serde::ts_milliseconds;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLCV bucket of market data.
///
/// Candles are immutable once built. A series handed to the engine must be strictly
/// increasing in `timestamp`.
///
/// With the `serde` feature the timestamp is (de)serialized as epoch milliseconds, which is
/// what kline endpoints return:
///
/// ```json
/// { "open_time": 1759813200000, "open_price": 124499.99, "high_price": 124640.76,
///   "low_price": 124240.37, "close_price": 124414.17, "volume": 424.20697 }
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    #[cfg_attr(feature = "serde", serde(with = "ts_milliseconds", alias = "open_time"))]
    timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(alias = "open_price"))]
    open: f64,
    #[cfg_attr(feature = "serde", serde(alias = "high_price"))]
    high: f64,
    #[cfg_attr(feature = "serde", serde(alias = "low_price"))]
    low: f64,
    #[cfg_attr(feature = "serde", serde(alias = "close_price"))]
    close: f64,
    volume: f64,
}

impl Candle {
    /// Returns the opening time of the bucket.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Step-by-step constructor for [`Candle`].
///
/// ### Example
/// ```rust
/// use qqe_bts::prelude::*;
/// use chrono::DateTime;
///
/// let candle = CandleBuilder::builder()
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1.0)
///     .timestamp(DateTime::default())
///     .build()
///     .unwrap();
/// assert_eq!(candle.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct CandleBuilder {
    timestamp: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the bucket timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume. Defaults to `0.0` when omitted.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates the fields and builds the candle.
    ///
    /// Missing prices are an error. NaN prices are accepted so gaps in the data can flow
    /// through the indicator as undefined values; finite prices must satisfy
    /// `low <= open, close <= high`.
    pub fn build(self) -> Result<Candle> {
        let timestamp = self.timestamp.ok_or(Error::MissingField("timestamp"))?;
        let open = self.open.ok_or(Error::MissingField("open"))?;
        let high = self.high.ok_or(Error::MissingField("high"))?;
        let low = self.low.ok_or(Error::MissingField("low"))?;
        let close = self.close.ok_or(Error::MissingField("close"))?;
        let volume = self.volume.unwrap_or(0.0);

        if high < low {
            return Err(Error::InvalidCandle(format!("high ({high}) is below low ({low})")));
        }
        if open > high || open < low {
            return Err(Error::InvalidCandle(format!("open ({open}) is outside [{low}, {high}]")));
        }
        if close > high || close < low {
            return Err(Error::InvalidCandle(format!("close ({close}) is outside [{low}, {high}]")));
        }
        if volume < 0.0 {
            return Err(Error::InvalidCandle(format!("volume ({volume}) is negative")));
        }

        Ok(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

#[cfg(test)]
#[test]
fn build_valid_candle() {
    let candle = CandleBuilder::builder()
        .open(100.0)
        .high(110.0)
        .low(95.0)
        .close(105.0)
        .volume(3.0)
        .timestamp(DateTime::from_timestamp_secs(1515151515).unwrap())
        .build()
        .unwrap();

    assert_eq!(candle.open(), 100.0);
    assert_eq!(candle.high(), 110.0);
    assert_eq!(candle.low(), 95.0);
    assert_eq!(candle.close(), 105.0);
    assert_eq!(candle.volume(), 3.0);
    assert_eq!(candle.timestamp().timestamp(), 1515151515);
}

#[cfg(test)]
#[test]
fn build_missing_field() {
    let result = CandleBuilder::builder().open(1.0).high(1.0).low(1.0).close(1.0).build();
    assert!(matches!(result, Err(Error::MissingField("timestamp"))));

    let result = CandleBuilder::builder()
        .timestamp(DateTime::default())
        .high(1.0)
        .low(1.0)
        .close(1.0)
        .build();
    assert!(matches!(result, Err(Error::MissingField("open"))));
}

#[cfg(test)]
#[test]
fn build_inconsistent_prices() {
    let result = CandleBuilder::builder()
        .timestamp(DateTime::default())
        .open(100.0)
        .high(90.0)
        .low(95.0)
        .close(92.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidCandle(_))));

    let result = CandleBuilder::builder()
        .timestamp(DateTime::default())
        .open(100.0)
        .high(110.0)
        .low(95.0)
        .close(111.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidCandle(_))));
}

#[cfg(test)]
#[test]
fn build_accepts_gap() {
    let candle = CandleBuilder::builder()
        .timestamp(DateTime::default())
        .open(f64::NAN)
        .high(f64::NAN)
        .low(f64::NAN)
        .close(f64::NAN)
        .build()
        .unwrap();
    assert!(candle.close().is_nan());
    assert_eq!(candle.volume(), 0.0);
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn deserialize_kline() {
    let json = r#"{
        "open_time": 1759813200000,
        "open_price": 124499.99,
        "high_price": 124640.76,
        "low_price": 124240.37,
        "close_price": 124414.17,
        "volume": 424.20697
    }"#;
    let candle: Candle = serde_json::from_str(json).unwrap();
    assert_eq!(candle.timestamp().timestamp_millis(), 1759813200000);
    assert_eq!(candle.close(), 124414.17);
}
