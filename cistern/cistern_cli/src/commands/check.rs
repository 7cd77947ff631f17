//! Configuration commands

use crate::config::CliConfig;
use anyhow::{Context, Result};
use cistern_pool::PoolConfig;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the check-config command
#[derive(Args)]
pub struct CheckConfigArgs {
    /// Path to the configuration file
    #[clap(long)]
    pub config: PathBuf,
}

/// Render the effective pool settings.
pub fn describe(pool: &PoolConfig) -> String {
    let timeout = match pool.timeout {
        Some(timeout) => format!("{}ms", timeout.as_millis()),
        None => "unlimited".to_string(),
    };

    format!(
        "  capacity:            {}\n  overflow:            {}\n  max size:            {}\n  timeout:             {}\n  validate on release: {}\n  orphan warnings:     {}\n",
        pool.capacity,
        pool.overflow,
        pool.max_size(),
        timeout,
        pool.validate_on_release,
        pool.orphan_warnings
    )
}

/// Implementation of the check-config command
pub fn execute_check(args: &CheckConfigArgs) -> Result<()> {
    let config = CliConfig::load(&args.config)?;
    let pool = config
        .pool_config()
        .with_context(|| format!("invalid [pool] section in {}", args.config.display()))?;

    println!("Pool configuration OK");
    print!("{}", describe(&pool));
    Ok(())
}

/// Implementation of the print-config command
pub fn execute_print() -> Result<()> {
    let text = toml::to_string(&CliConfig::default()).context("failed to render sample config")?;
    print!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_describe_limited_timeout() {
        let text = describe(&PoolConfig::new(2).overflow(3).timeout(Duration::from_millis(40)));
        assert!(text.contains("max size:            5"));
        assert!(text.contains("timeout:             40ms"));
    }

    #[test]
    fn test_describe_unlimited_timeout() {
        let text = describe(&PoolConfig::new(1).unlimited_wait());
        assert!(text.contains("unlimited"));
    }
}
