use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use qqe_bts::prelude::*;
use qqe_bts::utils::load_candles;

#[derive(Parser, Debug)]
#[command(name = "qqe-bts", version, about = "Backtest the QQE strategy on candle data")]
struct Cli {
    /// JSON array of candles.
    #[arg(long)]
    data: PathBuf,

    /// TOML file with the backtest configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the initial balance.
    #[arg(long)]
    initial_balance: Option<f64>,

    /// Overrides the fraction of the balance committed per position.
    #[arg(long)]
    risk_fraction: Option<f64>,

    /// Disables short positions.
    #[arg(long)]
    no_short: bool,

    /// Writes the full result as JSON.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log filter, overridden by `QQE_BTS_LOG`.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(log_level: &str, log_format: LogFormat) -> Result<()> {
    let filter = std::env::var("QQE_BTS_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter).context("invalid log filter")?;

    match log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(env_filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<BacktestConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => BacktestConfig::default(),
    };

    if let Some(balance) = cli.initial_balance {
        config = config.initial_balance(balance);
    }
    if let Some(fraction) = cli.risk_fraction {
        config = config.risk_fraction(fraction);
    }
    if cli.no_short {
        config = config.allow_short_selling(false);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    let config = load_config(&cli)?;
    let candles = load_candles(&cli.data).with_context(|| format!("failed to load {}", cli.data.display()))?;
    tracing::info!(candles = candles.len(), path = %cli.data.display(), "loaded candles");

    let mut backtest = Backtest::new(candles, config)?;
    let result = backtest.run()?;
    println!("{result}");

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "result written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("qqe-bts-{name}-{}.toml", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_without_file_or_overrides() {
        let cli = Cli::parse_from(["qqe-bts", "--data", "candles.json"]);
        assert_eq!(load_config(&cli).unwrap(), BacktestConfig::default());
    }

    #[test]
    fn file_then_overrides() {
        let path = write_config(
            "overrides",
            "initial_balance = 5000.0\nrisk_fraction = 0.02\n\n[qqe]\nrsi_period = 21\n",
        );
        let config_path = path.to_string_lossy().into_owned();

        let cli = Cli::parse_from(["qqe-bts", "--data", "candles.json", "--config", &config_path]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.initial_balance, 5000.0);
        assert_eq!(config.risk_fraction, 0.02);
        assert!(config.allow_short_selling);
        assert_eq!(config.qqe.rsi_period, 21);
        assert_eq!(config.qqe.smoothing_period, 5);

        let cli = Cli::parse_from([
            "qqe-bts",
            "--data",
            "candles.json",
            "--config",
            &config_path,
            "--initial-balance",
            "250",
            "--risk-fraction",
            "0.5",
            "--no-short",
        ]);
        let config = load_config(&cli).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.initial_balance, 250.0);
        assert_eq!(config.risk_fraction, 0.5);
        assert!(!config.allow_short_selling);
        assert_eq!(config.qqe.rsi_period, 21);
    }

    #[test]
    fn unreadable_config_file() {
        let cli = Cli::parse_from(["qqe-bts", "--data", "candles.json", "--config", "/nonexistent/qqe-bts.toml"]);
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }
}
