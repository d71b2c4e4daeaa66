#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Cash account of a backtest.
///
/// The realized balance only moves when a position is closed; the mark-to-market value of the
/// open position is tracked separately as unrealized P&L.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Wallet {
    // Initial balance used for reset
    initial_balance: f64,
    // Realized balance
    balance: f64,
    // Unrealized profit/loss of the open position
    unrealized_pnl: f64,
}

impl Wallet {
    /// Creates a new wallet with the given initial balance.
    /// Non-positive balances are rejected.
    pub fn new(balance: f64) -> Result<Self> {
        if balance <= 0.0 || !balance.is_finite() {
            return Err(Error::NegZeroBalance(balance));
        }

        Ok(Self::funded(balance))
    }

    /// Wallet over a balance that was already validated.
    pub(crate) fn funded(balance: f64) -> Self {
        Self {
            balance,
            unrealized_pnl: 0.0,
            initial_balance: balance,
        }
    }

    /// Returns the balance the wallet started with.
    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Returns the realized balance.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Returns the unrealized P&L of the open position.
    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }

    /// Returns the equity: realized balance plus unrealized P&L.
    pub fn total_balance(&self) -> f64 {
        self.balance + self.unrealized_pnl
    }

    /// Books a realized profit or loss and clears the unrealized part.
    pub(crate) fn realize(&mut self, pnl: f64) {
        self.balance += pnl;
        self.unrealized_pnl = 0.0;
    }

    /// Updates the unrealized P&L.
    pub(crate) fn set_unrealized_pnl(&mut self, pnl: f64) {
        self.unrealized_pnl = pnl;
    }

    /// Resets the wallet to its initial balance.
    pub(crate) fn reset(&mut self) {
        self.unrealized_pnl = 0.0;
        self.balance = self.initial_balance;
    }
}

#[cfg(test)]
#[test]
fn new_wallet_valid_balance() {
    let wallet = Wallet::new(100.0).unwrap();
    assert_eq!(wallet.balance(), 100.0);
    assert_eq!(wallet.initial_balance(), 100.0);
    assert_eq!(wallet.total_balance(), 100.0);
}

#[cfg(test)]
#[test]
fn new_wallet_invalid_balance() {
    let result = Wallet::new(0.0);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let result = Wallet::new(-10.0);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let result = Wallet::new(f64::NAN);
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));
}

#[cfg(test)]
#[test]
fn realize_profit_and_loss() {
    let mut wallet = Wallet::new(1000.0).unwrap();
    wallet.set_unrealized_pnl(1.0);
    wallet.realize(1.0);
    assert_eq!(wallet.balance(), 1001.0);
    assert_eq!(wallet.unrealized_pnl(), 0.0);

    wallet.realize(-11.0);
    assert_eq!(wallet.balance(), 990.0);
}

#[cfg(test)]
#[test]
fn unrealized_pnl() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.set_unrealized_pnl(10.0); // unrealized gain
    assert_eq!(wallet.total_balance(), 110.0);
    assert_eq!(wallet.balance(), 100.0);

    wallet.set_unrealized_pnl(-5.0); // unrealized loss
    assert_eq!(wallet.total_balance(), 95.0);
    assert_eq!(wallet.balance(), 100.0);
}

#[cfg(test)]
#[test]
fn reset_wallet() {
    let mut wallet = Wallet::new(100.0).unwrap();
    wallet.realize(10.0);
    wallet.set_unrealized_pnl(3.0);

    wallet.reset();
    assert_eq!(wallet.balance(), 100.0);
    assert_eq!(wallet.total_balance(), 100.0);
}
