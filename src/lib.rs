// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod cooldown;
pub mod dedup;
pub mod fetch;
pub mod orchestrator;
pub mod providers;
pub mod report;
pub mod rumor;
pub mod schedule;
pub mod significance;
pub mod state;
pub mod telemetry;

// Outbound chat sinks
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::config::BotConfig;
pub use crate::notify::{DynNotifier, Notifier};
pub use crate::orchestrator::{Collaborators, Orchestrator, RunSummary, TriggerMode};
pub use crate::state::{PersistedState, StateStore};
