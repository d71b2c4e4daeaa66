use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Duration, Utc};

use super::*;
use crate::config::QqeConfig;
use crate::indicators::detect_signals;
use crate::metrics::NO_TRADES_SUMMARY;

fn time(index: usize) -> DateTime<Utc> {
    DateTime::from_timestamp_secs(1_700_000_000).unwrap() + Duration::hours(index as i64)
}

fn candle(index: usize, close: f64) -> Candle {
    CandleBuilder::builder()
        .timestamp(time(index))
        .open(close)
        .high(close)
        .low(close)
        .close(close)
        .volume(1.0)
        .build()
        .unwrap()
}

fn candles(closes: &[f64]) -> Vec<Candle> {
    closes.iter().enumerate().map(|(i, &c)| candle(i, c)).collect()
}

fn wave(n: usize) -> Vec<Candle> {
    let closes = (0..n)
        .map(|i| 100.0 + 10.0 * (i as f64 * std::f64::consts::TAU / 40.0).sin())
        .collect::<Vec<_>>();
    candles(&closes)
}

fn signals(pairs: &[(usize, Signal)], len: usize) -> Vec<Signal> {
    let mut signals = vec![Signal::None; len];
    for &(index, signal) in pairs {
        signals[index] = signal;
    }
    signals
}

fn equity(bt: &Backtest) -> Vec<f64> {
    bt.equity_curve().iter().map(|p| p.equity).collect()
}

#[test]
fn long_trade_sizing_and_pnl() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 110.0]), BacktestConfig::default()).unwrap();
    let result = bt
        .simulate(&signals(&[(1, Signal::Buy), (2, Signal::Sell)], 3), None)
        .unwrap();

    assert_eq!(result.num_trades, 1);
    let trade = result.trades[0];
    assert_eq!(trade.side(), PositionSide::Long);
    assert_eq!(trade.size(), 0.1);
    assert_eq!(trade.entry_price(), 100.0);
    assert_eq!(trade.exit_price(), 110.0);
    assert_eq!(trade.entry_time(), time(1));
    assert_eq!(trade.exit_time(), time(2));
    assert!((trade.profit_loss() - 1.0).abs() < 1e-9);
    assert!((trade.profit_loss_percent() - 10.0).abs() < 1e-9);
    assert!((result.final_balance - 1001.0).abs() < 1e-9);
    assert!((bt.balance() - 1001.0).abs() < 1e-9);
    assert!(bt.position().is_none());

    // equity is marked before the transition of each candle
    assert_eq!(equity(&bt), vec![1000.0, 1000.0, 1001.0]);
    assert_eq!(result.win_rate, 100.0);
    assert_eq!(result.profit_factor, f64::INFINITY);
}

#[test]
fn short_trade() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 95.0, 90.0]), BacktestConfig::default()).unwrap();
    let result = bt
        .simulate(&signals(&[(1, Signal::Sell), (3, Signal::Buy)], 4), None)
        .unwrap();

    assert_eq!(result.num_trades, 1);
    assert_eq!(result.trades[0].side(), PositionSide::Short);
    assert!((result.trades[0].profit_loss() - 1.0).abs() < 1e-9);
    assert!((equity(&bt)[2] - 1000.5).abs() < 1e-9);
    assert!((result.final_balance - 1001.0).abs() < 1e-9);
}

#[test]
fn sell_without_position_and_shorts_disabled() {
    let mut qqe = vec![f64::NAN; 19];
    qqe.extend([10.0, 10.0, 10.0, -5.0, -5.0]);
    let detected = detect_signals(&qqe);
    assert_eq!(detected[22], Signal::Sell);

    let closes = vec![100.0; qqe.len()];
    let config = BacktestConfig::default().allow_short_selling(false);
    let mut bt = Backtest::new(candles(&closes), config).unwrap();
    let result = bt.simulate(&detected, None).unwrap();

    assert!(bt.position().is_none());
    assert!(result.trades.is_empty());
    assert_eq!(result.summary, NO_TRADES_SUMMARY);
    assert_eq!(result.final_balance, 1000.0);
    assert!(equity(&bt).iter().all(|&e| e == 1000.0));
}

#[test]
fn sell_without_position_opens_short_when_allowed() {
    let mut bt = Backtest::new(candles(&[100.0; 4]), BacktestConfig::default()).unwrap();
    bt.simulate(&signals(&[(2, Signal::Sell)], 4), None).unwrap();

    // force-closed at the last candle
    assert_eq!(bt.trades().len(), 1);
    assert_eq!(bt.trades()[0].side(), PositionSide::Short);
    assert_eq!(bt.trades()[0].profit_loss(), 0.0);
}

#[test]
fn repeated_signal_keeps_single_position() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 105.0, 110.0, 120.0]), BacktestConfig::default()).unwrap();
    let signals = signals(&[(1, Signal::Buy), (2, Signal::Buy), (3, Signal::Buy)], 5);

    let (first, second) = (bt.candles()[1], bt.candles()[2]);
    bt.step(1, &first, signals[1]).unwrap();
    let opened = *bt.position().unwrap();
    bt.step(2, &second, signals[2]).unwrap();
    assert_eq!(bt.position(), Some(&opened));

    bt.reset();
    let result = bt.simulate(&signals, None).unwrap();
    assert_eq!(result.num_trades, 1);
    assert_eq!(result.trades[0].entry_time(), time(1));
}

#[test]
fn open_position_force_closed_at_end() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 110.0, 120.0]), BacktestConfig::default()).unwrap();
    let result = bt.simulate(&signals(&[(1, Signal::Buy)], 4), None).unwrap();

    assert!(bt.position().is_none());
    assert_eq!(result.num_trades, 1);
    assert_eq!(result.trades[0].exit_price(), 120.0);
    assert_eq!(result.trades[0].exit_time(), time(3));
    assert!((result.trades[0].profit_loss() - 2.0).abs() < 1e-9);
    assert_eq!(bt.equity_curve().len(), 4);
}

#[test]
fn balance_moves_only_on_close() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 90.0, 80.0, 85.0]), BacktestConfig::default()).unwrap();
    bt.simulate(&signals(&[(1, Signal::Buy), (4, Signal::Sell)], 5), None)
        .unwrap();

    let curve = equity(&bt);
    assert!((curve[2] - 999.0).abs() < 1e-9);
    assert!((curve[3] - 998.0).abs() < 1e-9);
    assert!((bt.balance() - 998.5).abs() < 1e-9);
    assert_eq!(bt.unrealized_pnl(), 0.0);
}

#[test]
fn zero_size_position_is_not_opened() {
    let config = BacktestConfig::default().risk_fraction(0.0);
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 110.0]), config).unwrap();
    let result = bt.simulate(&signals(&[(1, Signal::Buy)], 3), None).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.final_balance, 1000.0);
}

#[test]
fn entry_at_unusable_price() {
    let mut bt = Backtest::new(candles(&[100.0, 0.0, 110.0]), BacktestConfig::default()).unwrap();
    let result = bt.simulate(&signals(&[(1, Signal::Buy)], 3), None);
    assert!(matches!(result, Err(Error::EntryPrice { index: 1, price }) if price == 0.0));
}

#[test]
fn exit_at_gap() {
    let mut data = candles(&[100.0, 100.0, 110.0]);
    data[2] = CandleBuilder::builder()
        .timestamp(time(2))
        .open(f64::NAN)
        .high(f64::NAN)
        .low(f64::NAN)
        .close(f64::NAN)
        .build()
        .unwrap();

    let mut bt = Backtest::new(data, BacktestConfig::default()).unwrap();
    let result = bt.simulate(&signals(&[(1, Signal::Buy)], 3), None);
    assert!(matches!(result, Err(Error::ExitPrice { index: 2, .. })));
}

#[test]
fn equity_curve_matches_candles() {
    let data = wave(200);
    let mut bt = Backtest::new(data, BacktestConfig::default()).unwrap();
    let result = bt.run().unwrap();

    assert_eq!(result.equity_curve.len(), 200);
    assert_eq!(result.equity_curve[0].equity, 1000.0);
    for (point, candle) in result.equity_curve.iter().zip(bt.candles()) {
        assert_eq!(point.timestamp, candle.timestamp());
    }
}

#[test]
fn wave_produces_closed_trades() {
    let mut bt = Backtest::new(wave(300), BacktestConfig::default()).unwrap();
    let result = bt.run().unwrap();

    assert!(result.num_trades > 0);
    assert!(bt.position().is_none());
    for pair in result.trades.windows(2) {
        assert!(pair[0].exit_time() <= pair[1].entry_time());
    }
    for trade in &result.trades {
        assert!(trade.entry_time() >= time(19));
        assert!(trade.entry_time() <= trade.exit_time());
    }

    let total = result.trades.iter().map(|t| t.profit_loss()).sum::<f64>();
    assert!((result.final_balance - (1000.0 + total)).abs() < 1e-9);
}

#[test]
fn no_trades_without_short_selling_on_downtrend() {
    let closes = (0..100).map(|i| 200.0 - i as f64).collect::<Vec<_>>();
    let config = BacktestConfig::default().allow_short_selling(false);
    let mut bt = Backtest::new(candles(&closes), config).unwrap();
    let result = bt.run().unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.summary, NO_TRADES_SUMMARY);
    assert_eq!(result.final_balance, 1000.0);
    assert_eq!(result.win_rate, 0.0);
    assert_eq!(result.profit_factor, 0.0);
}

#[test]
fn empty_data_is_not_an_error() {
    let mut bt = Backtest::new(Vec::<Candle>::new(), BacktestConfig::default()).unwrap();
    let result = bt.run().unwrap();

    assert_eq!(result.summary, crate::metrics::NO_DATA_SUMMARY);
    assert_eq!(result.final_balance, 1000.0);
    assert!(result.equity_curve.is_empty());
}

#[test]
fn insufficient_data() {
    let mut bt = Backtest::new(wave(10), BacktestConfig::default()).unwrap();
    assert!(matches!(
        bt.run(),
        Err(Error::InsufficientData {
            required: 19,
            available: 10
        })
    ));
}

#[test]
fn unordered_candles() {
    let mut data = wave(5);
    data[3] = candle(2, 100.0);
    let result = Backtest::new(data, BacktestConfig::default());
    assert!(matches!(result, Err(Error::UnorderedCandles { index: 3 })));
}

#[test]
fn invalid_config() {
    let result = Backtest::new(wave(30), BacktestConfig::default().risk_fraction(-0.5));
    assert!(matches!(result, Err(Error::NegRiskFraction(_))));

    let config = BacktestConfig::default().qqe(QqeConfig::default().rsi_period(0));
    let result = Backtest::new(wave(30), config);
    assert!(matches!(result, Err(Error::NegZeroPeriod { .. })));

    let result = Backtest::new(wave(30), BacktestConfig::default().initial_balance(0.0));
    assert!(matches!(result, Err(Error::NegZeroBalance(_))));

    let config = BacktestConfig::default().qqe(QqeConfig::default().slow_multiplier(f64::NAN));
    let result = Backtest::new(wave(30), config);
    assert!(matches!(result, Err(Error::NegZeroMultiplier { .. })));
}

#[test]
fn cancelled_run() {
    let mut bt = Backtest::new(wave(60), BacktestConfig::default()).unwrap();
    let cancel = AtomicBool::new(true);
    let result = bt.run_with_cancel(&cancel);

    assert!(matches!(result, Err(Error::Cancelled { index: 0 })));
    assert_eq!(bt.equity_curve().len(), 1);
}

#[test]
fn cancelled_mid_run_keeps_partial_state() {
    let mut bt = Backtest::new(candles(&[100.0, 100.0, 105.0, 110.0, 120.0, 130.0]), BacktestConfig::default()).unwrap();
    let result = bt.simulate_until(&signals(&[(1, Signal::Buy), (5, Signal::Sell)], 6), |index| index == 3);

    assert!(matches!(result, Err(Error::Cancelled { index: 3 })));
    assert_eq!(bt.equity_curve().len(), 4);
    // the open position is left as it was, not force-closed
    assert_eq!(bt.position().map(|p| p.side()), Some(PositionSide::Long));
    assert!(bt.trades().is_empty());
    assert_eq!(bt.balance(), 1000.0);
    assert!((equity(&bt)[3] - 1001.0).abs() < 1e-9);
}

#[test]
fn uncancelled_run_matches_run() {
    let mut bt = Backtest::new(wave(120), BacktestConfig::default()).unwrap();
    let expected = bt.run().unwrap();
    let result = bt.run_with_cancel(&AtomicBool::new(false)).unwrap();
    assert_eq!(result, expected);
}

#[test]
fn deterministic_reruns() {
    let mut bt = Backtest::new(wave(250), BacktestConfig::default()).unwrap();
    let first = bt.run().unwrap();
    let second = bt.run().unwrap();
    assert_eq!(first, second);

    bt.reset();
    assert!(bt.trades().is_empty());
    assert!(bt.equity_curve().is_empty());
    assert_eq!(bt.balance(), 1000.0);
}

#[test]
fn concurrent_backtests_share_data() {
    let data: Arc<[Candle]> = wave(250).into();
    let expected = Backtest::new(Arc::clone(&data), BacktestConfig::default())
        .unwrap()
        .run()
        .unwrap();

    let results = std::thread::scope(|s| {
        let handles = (0..4)
            .map(|_| {
                let data = Arc::clone(&data);
                s.spawn(move || Backtest::new(data, BacktestConfig::default()).unwrap().run().unwrap())
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });

    for result in results {
        assert_eq!(result, expected);
    }
}
