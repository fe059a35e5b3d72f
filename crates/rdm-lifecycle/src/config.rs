// config.rs — RDM configuration and on-disk layout.
//
// Configuration lives in `.rdm/config.toml`. Every section and field is
// optional; anything missing takes its default.
//
// ```toml
// [pledge]
// min_amount = 50
// max_amount = 500
//
// [evaluation]
// success_threshold = 80
// partial_threshold = 40
//
// [distribution]
// peer_bonus = 5
// innovation_bonus = 10
// max_total_payout = 600
//
// [lifecycle]
// lock_timeout_ms = 5000
// ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rdm_settlement::{DistributionConfig, EvaluationConfig, SettlementConfig};
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;

/// Accepted pledge range, in token units (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PledgeConfig {
    pub min_amount: u64,
    pub max_amount: u64,
}

impl Default for PledgeConfig {
    fn default() -> Self {
        Self {
            min_amount: 50,
            max_amount: 500,
        }
    }
}

impl PledgeConfig {
    pub fn validate(&self, amount: u64) -> Result<(), LifecycleError> {
        if amount == 0 || amount < self.min_amount || amount > self.max_amount {
            return Err(LifecycleError::InvalidPledge {
                amount,
                min: self.min_amount,
                max: self.max_amount,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long to wait for another request on the same goal before giving
    /// up with a retryable error.
    pub lock_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
        }
    }
}

impl LifecycleConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Top-level configuration (`.rdm/config.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RdmConfig {
    #[serde(default)]
    pub pledge: PledgeConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub distribution: DistributionConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl RdmConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let content = std::fs::read_to_string(path).map_err(|e| LifecycleError::Config {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::parse(&content).map_err(|detail| LifecycleError::Config {
            path: path.display().to_string(),
            detail,
        })
    }

    /// Load configuration, falling back to defaults if the file is absent.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, LifecycleError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn parse(content: &str) -> Result<Self, String> {
        let config: RdmConfig = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.pledge.min_amount > self.pledge.max_amount {
            return Err(format!(
                "pledge.min_amount {} exceeds pledge.max_amount {}",
                self.pledge.min_amount, self.pledge.max_amount
            ));
        }
        let e = &self.evaluation;
        if e.partial_threshold > e.success_threshold || e.success_threshold > 100 {
            return Err(format!(
                "evaluation thresholds must satisfy partial ({}) <= success ({}) <= 100",
                e.partial_threshold, e.success_threshold
            ));
        }
        Ok(())
    }

    /// The evaluation and distribution halves, for the settlement engine.
    pub fn settlement(&self) -> SettlementConfig {
        SettlementConfig {
            evaluation: self.evaluation.clone(),
            distribution: self.distribution.clone(),
        }
    }
}

/// Where RDM keeps its state for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub root: PathBuf,
    pub goals_dir: PathBuf,
    pub reflections_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub events_log: PathBuf,
    pub config_file: PathBuf,
}

impl StoreLayout {
    /// Standard layout under `<project_root>/.rdm/`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let rdm_dir = root.join(".rdm");
        Self {
            root,
            goals_dir: rdm_dir.join("goals"),
            reflections_dir: rdm_dir.join("reflections"),
            ledger_dir: rdm_dir.join("ledger"),
            events_log: rdm_dir.join("events.jsonl"),
            config_file: rdm_dir.join("config.toml"),
        }
    }
}
