//! JSON I/O for solver settings and run summaries.
//!
//! Missing fields in a configuration file fall back to their defaults, so a
//! file containing only `{"epsilon": 0.67}` is valid.

use crate::sim::groundwater::{SolverConfig, WaterBudget};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes a solver configuration to a JSON file.
pub fn write_config(path: &Path, config: &SolverConfig) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, config)
        .with_context(|| format!("Failed to serialize config to: {}", path.display()))?;

    Ok(())
}

/// Reads a solver configuration from a JSON file and validates it.
pub fn read_config(path: &Path) -> Result<SolverConfig> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let config: SolverConfig = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize config from: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in: {}", path.display()))?;

    Ok(config)
}

pub fn to_config_string(config: &SolverConfig) -> Result<String> {
    serde_json::to_string_pretty(config).context("Failed to serialize config to string")
}

pub fn from_config_string(json: &str) -> Result<SolverConfig> {
    let config: SolverConfig =
        serde_json::from_str(json).context("Failed to deserialize config from string")?;
    config.validate().context("Invalid config")?;
    Ok(config)
}

/// Writes the per-step water budgets of a run to a JSON file.
pub fn write_budgets(path: &Path, budgets: &[WaterBudget]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), budgets)
        .with_context(|| format!("Failed to serialize budgets to: {}", path.display()))?;
    Ok(())
}
