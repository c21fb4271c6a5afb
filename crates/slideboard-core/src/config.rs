//! Store configuration.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

#[cfg(target_arch = "wasm32")]
use web_time::Duration;

/// Delay before the selector overlay is refreshed after grouping, giving the
/// renderer time to lay out the new group.
pub const DEFAULT_OVERLAY_REFRESH_DELAY_MS: u64 = 200;

/// Stacking order assigned to newly created groups.
pub const DEFAULT_GROUP_Z_INDEX: i32 = 10;

/// Default nudge/zoom step.
pub const DEFAULT_DELTA: f64 = 1.0;

/// Which groups `destroy_group` dissolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UngroupScope {
    /// Every group in the scene, regardless of selection.
    #[default]
    AllGroups,
    /// Only the groups that are currently selected.
    Selected,
}

/// Tunables for a [`crate::SceneStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub overlay_refresh_delay_ms: u64,
    pub group_z_index: i32,
    pub default_delta: f64,
    pub ungroup_scope: UngroupScope,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            overlay_refresh_delay_ms: DEFAULT_OVERLAY_REFRESH_DELAY_MS,
            group_z_index: DEFAULT_GROUP_Z_INDEX,
            default_delta: DEFAULT_DELTA,
            ungroup_scope: UngroupScope::default(),
        }
    }
}

impl StoreConfig {
    /// Parse a configuration; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The step value must be finite and positive.
    pub fn validate(&self) -> StoreResult<()> {
        if !self.default_delta.is_finite() || self.default_delta <= 0.0 {
            return Err(StoreError::InvalidDelta(self.default_delta));
        }
        Ok(())
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn overlay_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.overlay_refresh_delay_ms)
    }
}
