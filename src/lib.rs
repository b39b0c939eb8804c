pub mod error;
pub mod grid;
pub mod io;
pub mod sim;

// Prelude
pub use error::{FlowError, FlowResult};
pub use grid::Grid;
pub use sim::groundwater::{
    CellKind, Conductivity, FlowSolution, GroundwaterSolver, ModelInputs, PcgConfig,
    SolverConfig, WaterBudget, simulate,
};
