//! CLI commands
//!
//! - `check-config`: validate a configuration file
//! - `print-config`: print a sample configuration file
//! - `stress`: run a concurrent workload against simulated connections

pub mod check;
pub mod stress;
