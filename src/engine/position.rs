use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    /// Profits when the price rises.
    Long,
    /// Profits when the price falls.
    Short,
}

/// The single open position held by a [`Backtest`](super::Backtest).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    side: PositionSide,
    entry_price: f64,
    size: f64,
    entry_time: DateTime<Utc>,
}

impl Position {
    pub(crate) fn new(side: PositionSide, entry_price: f64, size: f64, entry_time: DateTime<Utc>) -> Self {
        Self {
            side,
            entry_price,
            size,
            entry_time,
        }
    }

    /// Returns the position side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the size in asset units.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns the entry time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Profit or loss if the position were closed at `price`.
    pub fn pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.size * (price - self.entry_price),
            PositionSide::Short => self.size * (self.entry_price - price),
        }
    }

    /// Consumes the position and produces the trade record for an exit at `exit_price`.
    pub(crate) fn close(self, exit_price: f64, exit_time: DateTime<Utc>) -> Trade {
        let profit_loss = self.pnl(exit_price);
        Trade {
            side: self.side,
            entry_price: self.entry_price,
            exit_price,
            size: self.size,
            entry_time: self.entry_time,
            exit_time,
            profit_loss,
            profit_loss_percent: profit_loss / (self.entry_price * self.size) * 100.0,
        }
    }
}

/// A closed position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    side: PositionSide,
    entry_price: f64,
    exit_price: f64,
    size: f64,
    entry_time: DateTime<Utc>,
    exit_time: DateTime<Utc>,
    profit_loss: f64,
    profit_loss_percent: f64,
}

impl Trade {
    /// Returns the side the position was opened on.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the exit price.
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Returns the traded size.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Returns the entry time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the exit time.
    pub fn exit_time(&self) -> DateTime<Utc> {
        self.exit_time
    }

    /// Returns the realized profit or loss.
    pub fn profit_loss(&self) -> f64 {
        self.profit_loss
    }

    /// Returns the realized profit or loss relative to the entry notional, in percent.
    pub fn profit_loss_percent(&self) -> f64 {
        self.profit_loss_percent
    }

    /// Whether the trade made money.
    pub fn is_win(&self) -> bool {
        self.profit_loss > 0.0
    }
}

#[cfg(test)]
#[test]
fn long_pnl() {
    let position = Position::new(PositionSide::Long, 100.0, 0.1, DateTime::default());
    assert!((position.pnl(110.0) - 1.0).abs() < 1e-12);
    assert!((position.pnl(90.0) + 1.0).abs() < 1e-12);
}

#[cfg(test)]
#[test]
fn short_pnl() {
    let position = Position::new(PositionSide::Short, 100.0, 2.0, DateTime::default());
    assert_eq!(position.pnl(90.0), 20.0);
    assert_eq!(position.pnl(105.0), -10.0);
}

#[cfg(test)]
#[test]
fn close_long_into_trade() {
    let entry_time = DateTime::from_timestamp_secs(1515151515).unwrap();
    let exit_time = DateTime::from_timestamp_secs(1515155115).unwrap();
    let trade = Position::new(PositionSide::Long, 100.0, 0.1, entry_time).close(110.0, exit_time);

    assert_eq!(trade.side(), PositionSide::Long);
    assert_eq!(trade.entry_price(), 100.0);
    assert_eq!(trade.exit_price(), 110.0);
    assert_eq!(trade.entry_time(), entry_time);
    assert_eq!(trade.exit_time(), exit_time);
    assert!((trade.profit_loss() - 1.0).abs() < 1e-12);
    assert!((trade.profit_loss_percent() - 10.0).abs() < 1e-9);
    assert!(trade.is_win());
}

#[cfg(test)]
#[test]
fn close_short_at_loss() {
    let trade = Position::new(PositionSide::Short, 50.0, 4.0, DateTime::default()).close(55.0, DateTime::default());
    assert_eq!(trade.profit_loss(), -20.0);
    assert_eq!(trade.profit_loss_percent(), -10.0);
    assert!(!trade.is_win());
}
