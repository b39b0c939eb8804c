use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};

/// Default lower bound applied to hydraulic conductivities.
pub const DEFAULT_CONDUCTIVITY_FLOOR: f64 = 1e-20;

/// Default degree of implicitness (fully implicit, as MODFLOW).
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Settings of the preconditioned conjugate gradient solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcgConfig {
    /// Maximum number of PCG iterations per time step.
    ///
    /// The solver raises it to four iterations per active cell on large
    /// models.
    pub max_iterations: usize,
    /// Relative residual tolerance.
    pub rel_tolerance: f64,
    /// Absolute residual tolerance.
    pub abs_tolerance: f64,
}

impl Default for PcgConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            rel_tolerance: 1e-11,
            abs_tolerance: 1e-13,
        }
    }
}

/// Configuration of the transient groundwater solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Degree of implicitness in (0, 1].
    ///
    /// 1.0 is fully implicit (backward Euler). Values towards 0.5 are less
    /// damped (Crank-Nicolson like) but may oscillate for large steps.
    pub epsilon: f64,
    /// Conductivities below this value are raised to it.
    pub conductivity_floor: f64,
    pub pcg: PcgConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            conductivity_floor: DEFAULT_CONDUCTIVITY_FLOOR,
            pcg: PcgConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_conductivity_floor(mut self, floor: f64) -> Self {
        self.conductivity_floor = floor;
        self
    }

    pub fn with_pcg(mut self, pcg: PcgConfig) -> Self {
        self.pcg = pcg;
        self
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> FlowResult<()> {
        if !(self.epsilon > 0.0 && self.epsilon <= 1.0) {
            return Err(FlowError::InvalidConfiguration(format!(
                "epsilon must be in (0, 1], got {}",
                self.epsilon
            )));
        }
        if !(self.conductivity_floor > 0.0 && self.conductivity_floor.is_finite()) {
            return Err(FlowError::InvalidConfiguration(format!(
                "conductivity floor must be positive, got {}",
                self.conductivity_floor
            )));
        }
        if self.pcg.max_iterations == 0 {
            return Err(FlowError::InvalidConfiguration(
                "pcg.max_iterations must be > 0".to_string(),
            ));
        }
        if !(self.pcg.rel_tolerance > 0.0) || !(self.pcg.abs_tolerance > 0.0) {
            return Err(FlowError::InvalidConfiguration(format!(
                "pcg tolerances must be positive, got rel={} abs={}",
                self.pcg.rel_tolerance, self.pcg.abs_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fully_implicit() {
        let config = SolverConfig::default();
        assert_eq!(config.epsilon, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_epsilon_range() {
        assert!(SolverConfig::new().with_epsilon(0.5).validate().is_ok());
        assert!(SolverConfig::new().with_epsilon(0.0).validate().is_err());
        assert!(SolverConfig::new().with_epsilon(1.01).validate().is_err());
        assert!(SolverConfig::new().with_epsilon(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_rejects_bad_floor_and_pcg() {
        assert!(
            SolverConfig::new()
                .with_conductivity_floor(0.0)
                .validate()
                .is_err()
        );
        let pcg = PcgConfig {
            max_iterations: 0,
            ..PcgConfig::default()
        };
        assert!(SolverConfig::new().with_pcg(pcg).validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"epsilon": 0.67}"#).unwrap();
        assert_eq!(config.epsilon, 0.67);
        assert_eq!(config.conductivity_floor, DEFAULT_CONDUCTIVITY_FLOOR);
        assert_eq!(config.pcg, PcgConfig::default());
    }
}
