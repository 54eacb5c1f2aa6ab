//! Run configuration: optional JSON file plus command-line overrides.

use anyhow::{Context, Result};
use clap::Args;
use factorlab_combine::MultiFactorConfig;
use factorlab_eval::WinsorizeMethod;
use std::fs;
use std::path::PathBuf;

/// Flags shared by the backtest commands.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct RunOptions {
    /// JSON configuration file
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Number of quantile groups
    #[arg(short = 'g', long)]
    pub(crate) n_groups: Option<usize>,

    /// Forward return horizon in periods
    #[arg(short = 'H', long)]
    pub(crate) horizon: Option<usize>,

    /// Winsorize method (std or quantile)
    #[arg(long)]
    pub(crate) winsorize: Option<String>,

    /// Disable winsorizing
    #[arg(long)]
    pub(crate) no_winsorize: bool,

    /// Disable standardization
    #[arg(long)]
    pub(crate) no_standardize: bool,

    /// Annual risk-free rate
    #[arg(long)]
    pub(crate) risk_free: Option<f64>,
}

impl RunOptions {
    /// Reads the config file, if any, and applies flag overrides.
    pub(crate) fn resolve(&self) -> Result<MultiFactorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => MultiFactorConfig::default(),
        };

        let backtest = &mut config.backtest;
        if let Some(n_groups) = self.n_groups {
            backtest.n_groups = n_groups;
        }
        if let Some(horizon) = self.horizon {
            backtest.horizon = horizon;
        }
        if let Some(method) = &self.winsorize {
            backtest.preprocess.winsorize_method = method.parse::<WinsorizeMethod>()?;
        }
        if self.no_winsorize {
            backtest.preprocess.winsorize = false;
        }
        if self.no_standardize {
            backtest.preprocess.standardize = false;
        }
        if let Some(rate) = self.risk_free {
            backtest.metrics.risk_free_rate = rate;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factorlab_combine::OptimizationMethod;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = RunOptions::default().resolve().unwrap();
        assert_eq!(config, MultiFactorConfig::default());
    }

    #[test]
    fn test_flag_overrides() {
        let options = RunOptions {
            n_groups: Some(10),
            horizon: Some(5),
            winsorize: Some("quantile".to_string()),
            no_standardize: true,
            risk_free: Some(0.0),
            ..Default::default()
        };
        let config = options.resolve().unwrap();
        assert_eq!(config.backtest.n_groups, 10);
        assert_eq!(config.backtest.horizon, 5);
        assert_eq!(config.backtest.preprocess.winsorize_method.name(), "quantile");
        assert!(!config.backtest.preprocess.standardize);
        assert_eq!(config.backtest.metrics.risk_free_rate, 0.0);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let options = RunOptions {
            n_groups: Some(1),
            ..Default::default()
        };
        assert!(options.resolve().is_err());

        let options = RunOptions {
            winsorize: Some("mad".to_string()),
            ..Default::default()
        };
        assert!(options.resolve().is_err());
    }

    #[test]
    fn test_config_file() {
        let path = std::env::temp_dir().join(format!("factorlab-config-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"backtest": {{"n_groups": 3}}, "optimize": "sharpe"}}"#
        )
        .unwrap();

        let options = RunOptions {
            config: Some(path.clone()),
            horizon: Some(2),
            ..Default::default()
        };
        let config = options.resolve().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.backtest.n_groups, 3);
        assert_eq!(config.backtest.horizon, 2);
        assert_eq!(config.optimize, Some(OptimizationMethod::Sharpe));
    }
}
