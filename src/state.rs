// src/state.rs
//! Durable state blob: the engine's only memory between runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cooldown::LastAlerts;
use crate::dedup::SeenNews;
use crate::schedule::RunMarkers;

pub const DEFAULT_STATE_PATH: &str = "state/bot_state.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub last_alert: LastAlerts,
    #[serde(default)]
    pub seen_news: SeenNews,
    #[serde(default)]
    pub last_run_marker: RunMarkers,
}

/// JSON file backing for [`PersistedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// state. Losing dedup memory means alerts may repeat; aborting every
    /// run would mean no alerts at all.
    pub async fn load(&self) -> PersistedState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(target: "state", path = %self.path.display(), "no prior state, starting fresh");
                return PersistedState::default();
            }
            Err(e) => {
                tracing::warn!(target: "state", path = %self.path.display(), error = %e, "state unreadable, starting fresh");
                return PersistedState::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(target: "state", path = %self.path.display(), error = %e, "state malformed, starting fresh");
                PersistedState::default()
            }
        }
    }

    /// Write-to-temp-then-rename so a crash mid-write never leaves a torn file.
    /// The temp name carries the pid so two overlapping runs never share it.
    pub async fn save(&self, state: &PersistedState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating state dir {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(state).context("serializing state")?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", std::process::id()));
        if let Err(e) = fs::write(&tmp, &json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("writing {}", tmp.display()));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", self.path.display()));
        }
        Ok(())
    }
}
