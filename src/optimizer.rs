//! Strategy parameter optimization.
//!
//! This module runs the QQE backtest over many parameter combinations in parallel.
//! The `Optimizer` struct runs one independent backtest per combination, while the
//! `ParameterCombination` trait defines how to generate parameter sets.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::BacktestConfig;
use crate::engine::{Backtest, Candle};
use crate::errors::Result;
use crate::metrics::BacktestResult;

use rayon::prelude::*;

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(usize, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    fn generate() -> Vec<Self::Output>;
}

/// Optimizer for the QQE strategy over different parameter combinations.
///
/// The candles are shared between the worker threads; every combination gets its own
/// [`Backtest`], so runs never observe each other.
pub struct Optimizer<PC: ParameterCombination> {
    data: Arc<[Candle]>,
    config: BacktestConfig,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> From<&Backtest> for Optimizer<PC> {
    fn from(value: &Backtest) -> Self {
        Self {
            _marker: PhantomData,
            data: Arc::clone(value.shared_candles()),
            config: *value.config(),
        }
    }
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates a new `Optimizer`.
    ///
    /// # Arguments
    /// * `data` - Historical candle data for backtesting.
    /// * `config` - Base configuration each combination is applied to.
    pub fn new(data: impl Into<Arc<[Candle]>>, config: BacktestConfig) -> Self {
        Self {
            data: data.into(),
            config,
            _marker: PhantomData,
        }
    }

    /// Runs one backtest per parameter combination.
    ///
    /// # Arguments
    /// * `combinator` - Function that applies a parameter combination to the base configuration.
    ///
    /// # Returns
    /// Each combination with its backtest result, in generation order.
    ///
    /// # Errors
    /// Returns the first error of the combinator, of the configuration validation or of a run.
    pub fn with<C>(&self, combinator: C) -> Result<Vec<(PC::Output, BacktestResult)>>
    where
        C: Fn(BacktestConfig, &PC::Output) -> Result<BacktestConfig> + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);

        tracing::info!(combinations = combinations.len(), chunk_size, "optimizing");

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for param_set in par_combinations {
                    let config = combinator(self.config, param_set)?;
                    let mut backtest = Backtest::new(Arc::clone(&self.data), config)?;
                    local_results.push((param_set.clone(), backtest.run()?));
                }

                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}
