//! File I/O for solver settings and run results.

pub mod config;

pub use config::{read_config, write_budgets, write_config};
