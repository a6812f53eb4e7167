// src/schedule.rs
//! Run-once guard for the scheduled reports.
//!
//! The host scheduler fires every few minutes with no exact alignment, may
//! skip a slot, double-fire, or run next to a manual invocation. A report is
//! due when the local wall clock is inside `[HH:00, HH:window)` for its hour
//! and the marker `kind:YYYY-MM-DD` has not been set yet. All dates are taken
//! in one fixed UTC offset, so a logical day is never split between zones.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Midday,
    Partner,
    Close,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Midday => "midday",
            ReportKind::Partner => "partner",
            ReportKind::Close => "close",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A report and the local hour it is due at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReport {
    pub kind: ReportKind,
    pub hour: u32,
}

fn default_utc_offset_hours() -> i32 {
    1
}
fn default_window_minutes() -> u32 {
    10
}
fn default_marker_retention_days() -> i64 {
    7
}
fn default_reports() -> Vec<ScheduledReport> {
    vec![
        ScheduledReport {
            kind: ReportKind::Midday,
            hour: 12,
        },
        ScheduledReport {
            kind: ReportKind::Partner,
            hour: 15,
        },
        ScheduledReport {
            kind: ReportKind::Close,
            hour: 18,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Fixed offset used for every hour/date computation (CET = +1).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Width of the trigger window after the target hour, in minutes.
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    /// Markers older than this many days are dropped from the state blob.
    #[serde(default = "default_marker_retention_days")]
    pub marker_retention_days: i64,
    #[serde(default = "default_reports")]
    pub reports: Vec<ScheduledReport>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            window_minutes: default_window_minutes(),
            marker_retention_days: default_marker_retention_days(),
            reports: default_reports(),
        }
    }
}

impl ScheduleConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("invalid utc_offset_hours: {}", self.utc_offset_hours))
    }

    pub fn local_now(&self, now: DateTime<Utc>) -> Result<DateTime<FixedOffset>> {
        Ok(now.with_timezone(&self.offset()?))
    }
}

/// The only way run-marker keys are built, e.g. `midday:2025-09-06`.
pub fn marker_key(kind: ReportKind, local_date: NaiveDate) -> String {
    format!("{}:{}", kind.as_str(), local_date.format("%Y-%m-%d"))
}

/// `kind:date -> fired`, persisted as part of the state blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunMarkers(BTreeMap<String, bool>);

impl RunMarkers {
    pub fn has_run(&self, kind: ReportKind, local_date: NaiveDate) -> bool {
        self.0
            .get(&marker_key(kind, local_date))
            .copied()
            .unwrap_or(false)
    }

    /// True iff `local_now` is inside the report's trigger window and the
    /// report has not fired yet on that local date.
    pub fn should_run(
        &self,
        report: &ScheduledReport,
        local_now: DateTime<FixedOffset>,
        window_minutes: u32,
    ) -> bool {
        local_now.minute() < window_minutes
            && local_now.hour() == report.hour
            && !self.has_run(report.kind, local_now.date_naive())
    }

    /// Call only after the report was actually sent.
    pub fn mark_ran(&mut self, kind: ReportKind, local_date: NaiveDate) {
        self.0.insert(marker_key(kind, local_date), true);
    }

    /// Drop markers dated before `today - retention_days`. Keys that do not
    /// carry a parseable date are left alone.
    pub fn prune(&mut self, today: NaiveDate, retention_days: i64) -> usize {
        let cutoff = today - Duration::days(retention_days.max(0));
        let before = self.0.len();
        self.0.retain(|key, _| {
            key.rsplit_once(':')
                .and_then(|(_, d)| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map_or(true, |d| d >= cutoff)
        });
        before - self.0.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
