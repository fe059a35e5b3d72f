// mod.rs — Shared command context and output helpers.

pub mod goal;
pub mod ledger;
pub mod settle;

use rdm_lifecycle::{LifecycleController, RdmConfig, StoreLayout};
use serde::Serialize;
use uuid::Uuid;

/// Everything a command needs: where the project keeps its state, the
/// loaded config, and how to print.
pub struct Context {
    pub layout: StoreLayout,
    pub config: RdmConfig,
    pub json: bool,
}

impl Context {
    pub fn controller(&self) -> anyhow::Result<LifecycleController> {
        Ok(LifecycleController::open(&self.layout, &self.config)?)
    }

    /// Print `value` as JSON when `--json` is set, otherwise run `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id).map_err(|e| anyhow::anyhow!("invalid goal ID '{}': {}", id, e))
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn truncate_long_descriptions() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer description", 10), "a much ...");
    }

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(parse_id("not-a-uuid").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn controller_opens_in_fresh_project() {
        let dir = tempdir().unwrap();
        let ctx = Context {
            layout: StoreLayout::for_project(dir.path()),
            config: RdmConfig::default(),
            json: true,
        };
        let rdm = ctx.controller().unwrap();
        assert!(rdm.list(None).unwrap().is_empty());
        assert!(ctx.layout.goals_dir.exists());
    }
}
