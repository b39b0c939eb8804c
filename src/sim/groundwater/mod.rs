//! Transient block-centered finite-difference groundwater flow.
//!
//! Solves the saturated flow equation on a rectilinear 3D grid, or on an
//! axisymmetric grid of rings around a well, with implicit time stepping.
//!
//! # Architecture
//!
//! ```text
//! ModelInputs ──► build_conductances() ──► Conductances ─┐
//!     │                                                   ├─► assemble_conductance_matrix() ──► A
//!     └────────► Adjacency::from_grid() ─────────────────┘
//!
//! A ──► GroundwaterSolver::step() ──► pcg_solve() ──► heads ──► flows / WaterBudget
//!                 ▲
//!            simulate() loops over the time vector and collects a FlowSolution
//! ```
//!
//! Cells are classified from IBOUND as active, inactive (NaN head, no flow)
//! or fixed head (held at the initial head). Only active cells enter the
//! linear system; fixed heads appear on the right-hand side.

pub mod adjacency;
pub mod budget;
pub mod conductance;
pub mod config;
pub mod fields;
pub mod flows;
pub mod matrix;
pub mod pcg;
pub mod result;
pub mod solver;

pub use adjacency::{Adjacency, Axis, NodePair};
pub use budget::WaterBudget;
pub use conductance::{Conductances, HalfResistances, build_conductances};
pub use config::{PcgConfig, SolverConfig};
pub use fields::{CellKind, Conductivity, ModelInputs};
pub use flows::FaceFlows;
pub use matrix::{CsrBuilder, CsrMatrix, assemble_conductance_matrix};
pub use pcg::{PcgOutcome, pcg_solve};
pub use result::FlowSolution;
pub use solver::{GroundwaterSolver, StepFlows, simulate};
