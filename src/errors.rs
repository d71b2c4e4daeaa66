/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, configuring or running a backtest.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Fewer candles than the indicator needs to warm up.
    #[error("Insufficient data: the indicator needs at least {required} candles (got: {available})")]
    InsufficientData {
        /// Warm-up length (`rsi_period + smoothing_period`).
        required: usize,
        /// Number of candles supplied.
        available: usize,
    },

    /// An indicator period is zero.
    #[error("Period `{name}` must be positive (got: {value})")]
    NegZeroPeriod {
        /// Name of the period setting.
        name: &'static str,
        /// Offending value.
        value: usize,
    },

    /// A band multiplier is not strictly positive and finite.
    #[error("Multiplier `{name}` must be positive (got: {value})")]
    NegZeroMultiplier {
        /// Name of the multiplier setting.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// The risk fraction is negative or not finite.
    #[error("Risk fraction must be a non-negative number (got: {0})")]
    NegRiskFraction(f64),

    /// The initial or current balance is not positive. Trading requires a positive balance.
    #[error("Balance must be positive (got: {0})")]
    NegZeroBalance(f64),

    /// Candle timestamps are not strictly increasing.
    #[error("Candle at index {index} is not later than the previous one")]
    UnorderedCandles {
        /// Index of the first out-of-order candle.
        index: usize,
    },

    /// A required builder field was never set.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The candle prices are inconsistent.
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    /// A position cannot be opened at this price.
    #[error("Invalid entry price at index {index}: {price}")]
    EntryPrice {
        /// Candle index of the attempted entry.
        index: usize,
        /// Offending price.
        price: f64,
    },

    /// A position cannot be closed at this price.
    #[error("Invalid exit price at index {index}: {price}")]
    ExitPrice {
        /// Candle index of the attempted exit.
        index: usize,
        /// Offending price.
        price: f64,
    },

    /// The run was aborted through its cancellation flag.
    #[error("Backtest cancelled after candle {index}")]
    Cancelled {
        /// Last candle index that was fully processed.
        index: usize,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
