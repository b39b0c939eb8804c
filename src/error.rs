use thiserror::Error;

/// Result alias used throughout the crate.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors raised by the groundwater flow solver.
///
/// All validation errors are raised before any matrix is assembled, so a
/// failed call never leaves partial results behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// A grid-shaped input does not match the grid shape.
    #[error("shape of {field} {found:?} differs from that of the model {expected:?}")]
    ShapeMismatch {
        field: String,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    /// Time vector too short or not strictly increasing.
    #[error("invalid time vector: {0}")]
    InvalidTimeVector(String),

    /// The reduced system for the active cells could not be solved.
    #[error("singular system at time step {step}: {reason}")]
    SingularSystem { step: usize, reason: String },

    /// PCG ran out of iterations on a well-posed system.
    #[error(
        "PCG did not converge at time step {step}: residual {residual:.3e} after {iterations} iterations (tolerance {tolerance:.3e})"
    )]
    NotConverged {
        step: usize,
        iterations: usize,
        residual: f64,
        tolerance: f64,
    },

    /// Out-of-range solver parameter or physically invalid material field.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Coordinate vectors that do not describe a valid grid.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

impl FlowError {
    pub fn shape_mismatch(
        field: &str,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            field: field.to_string(),
            expected,
            found,
        }
    }

    pub fn singular(step: usize, reason: impl Into<String>) -> Self {
        Self::SingularSystem {
            step,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_field_and_shapes() {
        let err = FlowError::shape_mismatch("kx", (1, 2, 3), (1, 2, 4));
        let msg = err.to_string();
        assert!(msg.contains("kx"), "{msg}");
        assert!(msg.contains("(1, 2, 3)"), "{msg}");
        assert!(msg.contains("(1, 2, 4)"), "{msg}");
    }

    #[test]
    fn test_singular_message_has_step() {
        let err = FlowError::singular(7, "zero pivot");
        assert_eq!(
            err.to_string(),
            "singular system at time step 7: zero pivot"
        );
    }

    #[test]
    fn test_not_converged_message() {
        let err = FlowError::NotConverged {
            step: 2,
            iterations: 40,
            residual: 2e-3,
            tolerance: 1e-10,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("PCG did not converge at time step 2"), "{msg}");
        assert!(msg.contains("2.000e-3"), "{msg}");
        assert!(msg.contains("40 iterations"), "{msg}");
    }
}
