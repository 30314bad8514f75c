//! Co-activity signal detection for GitHub commit circles.
//!
//! Commit statistics are folded into a per-member, per-day index, compared
//! pairwise against the requesting member, and merged across circles.

pub mod activity;
pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod detector;
pub mod error;
pub mod index;
pub mod models;
pub mod report;
pub mod response;
pub mod rhythm;
pub mod source;

pub use aggregate::{
    activity_for_group, dashboard_for_group, recent_signals, rhythms_for_group, signals_for_group,
};
pub use config::SignalConfig;
pub use error::{Result, SignalError};
pub use source::{CommitStatsSource, PrefetchedStats, StatsSnapshot};
