//! Configuration for dynamic FBA runs
//!
//! This module provides the run parameters (step size, iteration cap,
//! numerical floors) together with the concurrency settings used by
//! parallel simulations to solve organisms side by side.

use crate::core::errors::SimulationError;
use serde::{Deserialize, Serialize};

/// Enumeration of supported concurrency modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Organisms are solved one after another on the calling thread
    #[default]
    Sequential,
    /// Organisms of a parallel run are solved concurrently using Rayon
    Rayon,
}

/// Configuration for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Nominal step size
    pub dt: f64,
    /// Maximum number of time points, including the initial one
    pub max_ticks: usize,
    /// Objective and step-size floor below which the run stops
    pub epsilon: f64,
    /// Concentrations above `-tolerance` count as non-negative
    pub tolerance: f64,
    /// The concurrency mode to use for per-organism solves
    pub concurrency_mode: ConcurrencyMode,
    /// The size of the thread pool for parallel execution
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
}

impl SimulationConfig {
    /// Create a configuration with step size `dt` and default values otherwise
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            max_ticks: 10_000,
            epsilon: 1e-6,
            tolerance: 1e-9,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the concurrency mode for per-organism solves
    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    /// Set the thread pool size for parallel execution
    ///
    /// # Note
    /// This setting only affects execution when concurrency_mode is Rayon
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    /// Reject parameters no run can make progress with
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimulationError::invalid(format!("dt must be positive, got {}", self.dt)));
        }
        if self.max_ticks == 0 {
            return Err(SimulationError::invalid("max_ticks must be at least 1"));
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(SimulationError::invalid(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(SimulationError::invalid(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.thread_pool_size == Some(0) {
            return Err(SimulationError::invalid("thread_pool_size must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.dt, 0.1);
        assert_eq!(config.max_ticks, 10_000);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.thread_pool_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SimulationConfig::new(0.25)
            .with_max_ticks(50)
            .with_epsilon(1e-3)
            .with_tolerance(1e-8)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4);

        assert_eq!(config.dt, 0.25);
        assert_eq!(config.max_ticks, 50);
        assert_eq!(config.epsilon, 1e-3);
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(SimulationConfig::new(0.0).validate().is_err());
        assert!(SimulationConfig::new(-1.0).validate().is_err());
        assert!(SimulationConfig::new(f64::NAN).validate().is_err());
        assert!(SimulationConfig::new(0.1).with_max_ticks(0).validate().is_err());
        assert!(SimulationConfig::new(0.1).with_epsilon(-1.0).validate().is_err());
        assert!(SimulationConfig::new(0.1).with_tolerance(f64::NAN).validate().is_err());
        assert!(SimulationConfig::new(0.1).with_thread_pool_size(0).validate().is_err());
    }

    #[test]
    fn test_config_serializes() {
        let config = SimulationConfig::new(0.5).with_concurrency(ConcurrencyMode::Rayon);
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
