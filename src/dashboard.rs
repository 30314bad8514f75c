//! Per-member commit totals for a circle over a week or the current month

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{CommitStatRecord, DateWindow, MemberKey, MemberProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardPeriod {
    Weekly,
    Monthly,
}

impl DashboardPeriod {
    /// Weekly covers the trailing `window_days`; monthly starts on the first.
    pub fn window(&self, today: NaiveDate, window_days: i64) -> DateWindow {
        match self {
            DashboardPeriod::Weekly => DateWindow::trailing(today, window_days),
            DashboardPeriod::Monthly => DateWindow::month_to_date(today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCommitSummary {
    pub date: NaiveDate,
    pub commit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryCommitSummary {
    pub repository: String,
    pub commit_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberCommitStats {
    pub github_user_id: MemberKey,
    pub github_username: String,
    pub avatar_url: String,
    pub total_commits: i64,
    /// Ascending by date, only days with records.
    pub daily_stats: Vec<DailyCommitSummary>,
    /// Busiest repository first.
    pub repo_stats: Vec<RepositoryCommitSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub period: DashboardPeriod,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub my_stats: MemberCommitStats,
    pub peers: Vec<MemberCommitStats>,
}

#[derive(Default)]
struct MemberTotals {
    total: i64,
    daily: BTreeMap<NaiveDate, i64>,
    repos: BTreeMap<String, i64>,
}

fn member_stats(profile: &MemberProfile, totals: Option<&MemberTotals>) -> MemberCommitStats {
    let (total_commits, daily_stats, mut repo_stats) = match totals {
        Some(totals) => (
            totals.total,
            totals
                .daily
                .iter()
                .map(|(date, count)| DailyCommitSummary {
                    date: *date,
                    commit_count: *count,
                })
                .collect(),
            totals
                .repos
                .iter()
                .map(|(repository, count)| RepositoryCommitSummary {
                    repository: repository.clone(),
                    commit_count: *count,
                })
                .collect::<Vec<_>>(),
        ),
        None => (0, Vec::new(), Vec::new()),
    };

    // Stable sort keeps repositories with equal counts in name order.
    repo_stats.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));

    MemberCommitStats {
        github_user_id: profile.member_key,
        github_username: profile.display_name.clone(),
        avatar_url: profile.avatar_url.clone(),
        total_commits,
        daily_stats,
        repo_stats,
    }
}

/// Sums commit counts per member, per day and per repository.
///
/// Every profile appears even without records, `self_key` as `my_stats` and
/// the rest in ascending key order. Records outside `window` or for members
/// without a profile are ignored.
pub fn build_dashboard(
    period: DashboardPeriod,
    window: DateWindow,
    records: &[CommitStatRecord],
    self_profile: &MemberProfile,
    profiles: &BTreeMap<MemberKey, MemberProfile>,
) -> Dashboard {
    let mut totals: BTreeMap<MemberKey, MemberTotals> = BTreeMap::new();

    for record in records {
        if !window.contains(record.date) {
            continue;
        }
        if record.member_key != self_profile.member_key && !profiles.contains_key(&record.member_key) {
            continue;
        }

        let count = i64::from(record.commit_count);
        let member = totals.entry(record.member_key).or_default();
        member.total += count;
        *member.daily.entry(record.date).or_default() += count;
        *member.repos.entry(record.repository.clone()).or_default() += count;
    }

    let peers = profiles
        .values()
        .filter(|profile| profile.member_key != self_profile.member_key)
        .map(|profile| member_stats(profile, totals.get(&profile.member_key)))
        .collect();

    Dashboard {
        period,
        start_date: window.start,
        end_date: window.end,
        my_stats: member_stats(self_profile, totals.get(&self_profile.member_key)),
        peers,
    }
}
