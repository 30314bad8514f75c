//! Circle-level signal pipeline and the cross-circle "recent signals" view

use std::collections::BTreeMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::activity::{activity_stream, ActivityItem};
use crate::dashboard::{build_dashboard, Dashboard, DashboardPeriod};
use crate::detector::{detect_signals, sort_newest_first};
use crate::error::{Result, SignalError};
use crate::index::{build_index, CommitDayIndex};
use crate::models::{CommitStatRecord, DateWindow, Group, MemberKey, MemberProfile, Signal};
use crate::rhythm::{weekly_rhythms, MemberRhythm};
use crate::source::CommitStatsSource;

fn profiles_by_key(group: &Group) -> BTreeMap<MemberKey, MemberProfile> {
    group
        .members
        .iter()
        .map(|member| (member.member_key, member.clone()))
        .collect()
}

/// Resolves the account inside `group` and loads that circle's statistics.
fn load_group<'g, S: CommitStatsSource>(
    source: &S,
    group: &'g Group,
    account_id: Uuid,
    window: DateWindow,
) -> Result<(&'g MemberProfile, Vec<CommitStatRecord>)> {
    let me = group
        .member_for_account(account_id)
        .ok_or_else(|| SignalError::NotAMember(format!("account {account_id}")))?;

    let records = source.commit_stats(&group.member_keys(), window)?;
    debug!(
        circle = %group.id,
        members = group.members.len(),
        records = records.len(),
        "loaded commit statistics"
    );
    Ok((me, records))
}

fn index_group<S: CommitStatsSource>(
    source: &S,
    group: &Group,
    account_id: Uuid,
    window: DateWindow,
) -> Result<(MemberKey, CommitDayIndex)> {
    let (me, records) = load_group(source, group, account_id, window)?;
    Ok((me.member_key, build_index(&records, &group.member_keys())?))
}

/// Runs fetch, index and detection for one circle.
///
/// Fails with `NotAMember` when `account_id` is not in the circle; fetch
/// failures and malformed records are returned as-is.
pub fn signals_for_group<S: CommitStatsSource>(
    source: &S,
    group: &Group,
    account_id: Uuid,
    window: DateWindow,
) -> Result<Vec<Signal>> {
    let (self_key, index) = index_group(source, group, account_id, window)?;
    detect_signals(&index, self_key, &profiles_by_key(group))
}

/// Weekly commit rhythm of every circle member, the account's own first.
pub fn rhythms_for_group<S: CommitStatsSource>(
    source: &S,
    group: &Group,
    account_id: Uuid,
    window: DateWindow,
) -> Result<Vec<MemberRhythm>> {
    let (self_key, index) = index_group(source, group, account_id, window)?;
    Ok(weekly_rhythms(&index, self_key, &profiles_by_key(group)))
}

/// Commit totals of the account and every other circle member over `window`.
pub fn dashboard_for_group<S: CommitStatsSource>(
    source: &S,
    group: &Group,
    account_id: Uuid,
    period: DashboardPeriod,
    window: DateWindow,
) -> Result<Dashboard> {
    let (me, records) = load_group(source, group, account_id, window)?;
    Ok(build_dashboard(period, window, &records, me, &profiles_by_key(group)))
}

/// Per-repository commit records of the whole circle, newest first.
pub fn activity_for_group<S: CommitStatsSource>(
    source: &S,
    group: &Group,
    account_id: Uuid,
    window: DateWindow,
) -> Result<Vec<ActivityItem>> {
    let (_, records) = load_group(source, group, account_id, window)?;
    Ok(activity_stream(&records, &profiles_by_key(group), window))
}

/// Merges signals across every circle `account_id` belongs to.
///
/// Circles the account cannot be matched in, or whose data cannot be fetched,
/// are logged and left out. The result is newest first and at most `limit` long.
pub fn recent_signals<S: CommitStatsSource>(
    source: &S,
    groups: &[Group],
    account_id: Uuid,
    window: DateWindow,
    limit: usize,
) -> Result<Vec<Signal>> {
    let mut all_signals = Vec::new();

    for group in groups {
        let signals = match signals_for_group(source, group, account_id, window) {
            Ok(signals) => signals,
            Err(err) if err.is_skippable() => {
                warn!(circle = %group.id, error = %err, "skipping circle");
                continue;
            }
            Err(err) => return Err(err),
        };

        all_signals.extend(signals.into_iter().map(|mut signal| {
            signal.group_id = Some(group.id);
            signal.group_name = Some(group.name.clone());
            signal
        }));
    }

    sort_newest_first(&mut all_signals);
    all_signals.truncate(limit);
    Ok(all_signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignalKind;
    use crate::source::StatsSnapshot;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
    }

    fn member(key: i64, account_id: Uuid) -> MemberProfile {
        MemberProfile {
            member_key: MemberKey(key),
            display_name: format!("dev{key}"),
            avatar_url: format!("https://avatars.example.com/{key}"),
            account_id,
        }
    }

    fn group(name: &str, members: Vec<MemberProfile>) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            members,
        }
    }

    fn stat(key: i64, date: NaiveDate, hour: Option<u8>, lang: &str) -> CommitStatRecord {
        CommitStatRecord {
            member_key: MemberKey(key),
            date,
            repository: format!("dev{key}/project"),
            commit_count: 4,
            primary_hour: hour,
            language: Some(lang.to_string()),
        }
    }

    /// Fails for any circle that includes the given member.
    struct FailingFor(MemberKey, StatsSnapshot);

    impl CommitStatsSource for FailingFor {
        fn commit_stats(&self, members: &[MemberKey], window: DateWindow) -> Result<Vec<CommitStatRecord>> {
            if members.contains(&self.0) {
                return Err(SignalError::DataFetch("connection reset".to_string()));
            }
            self.1.commit_stats(members, window)
        }
    }

    #[test]
    fn single_circle_requires_membership() {
        let me = Uuid::new_v4();
        let circle = group("rust-club", vec![member(200, Uuid::new_v4())]);
        let err = signals_for_group(&StatsSnapshot::default(), &circle, me, DateWindow::trailing(today(), 7))
            .unwrap_err();
        assert!(matches!(err, SignalError::NotAMember(_)));
    }

    #[test]
    fn single_circle_propagates_fetch_failure() {
        let me = Uuid::new_v4();
        let circle = group("rust-club", vec![member(100, me), member(200, Uuid::new_v4())]);
        let source = FailingFor(MemberKey(200), StatsSnapshot::default());
        let err = signals_for_group(&source, &circle, me, DateWindow::trailing(today(), 7)).unwrap_err();
        assert!(matches!(err, SignalError::DataFetch(_)));
    }

    #[test]
    fn circles_do_not_see_each_others_members() {
        let me = Uuid::new_v4();
        let shared = Uuid::new_v4();
        let first = group("first", vec![member(100, me), member(200, shared), member(300, Uuid::new_v4())]);
        let second = group("second", vec![member(100, me), member(200, shared)]);

        // Only member 300, who is not in the second circle, shares the language.
        let snapshot = StatsSnapshot::new(vec![
            stat(100, today(), None, "Elixir"),
            stat(300, today(), None, "Elixir"),
        ]);
        let window = DateWindow::trailing(today(), 7);

        let in_first = signals_for_group(&snapshot, &first, me, window).unwrap();
        assert!(in_first.iter().any(|signal| signal.kind == SignalKind::SameLanguage));

        let in_second = signals_for_group(&snapshot, &second, me, window).unwrap();
        assert!(in_second.is_empty());
    }

    #[test]
    fn recent_signals_are_tagged_and_capped() {
        let me = Uuid::new_v4();
        let first = group("first", vec![member(100, me), member(200, Uuid::new_v4())]);
        let second = group("second", vec![member(100, me), member(300, Uuid::new_v4())]);

        let mut records = Vec::new();
        for offset in 0..15 {
            let date = today() - Duration::days(offset);
            records.push(stat(100, date, None, "Go"));
            if offset % 2 == 0 {
                records.push(stat(200, date, None, "Rust"));
            } else {
                records.push(stat(300, date, None, "Zig"));
            }
        }
        let snapshot = StatsSnapshot::new(records);
        let window = DateWindow::trailing(today(), 30);

        let signals = recent_signals(&snapshot, &[first.clone(), second.clone()], me, window, 10).unwrap();
        assert_eq!(signals.len(), 10);
        let dates: Vec<_> = signals.iter().map(|signal| signal.date).collect();
        let expected: Vec<_> = (0..10).map(|offset| today() - Duration::days(offset)).collect();
        assert_eq!(dates, expected);
        assert_eq!(signals[0].group_id, Some(first.id));
        assert_eq!(signals[0].group_name.as_deref(), Some("first"));
        assert_eq!(signals[1].group_id, Some(second.id));
    }

    #[test]
    fn recent_signals_skip_failing_circles() {
        let me = Uuid::new_v4();
        let not_mine = group("strangers", vec![member(400, Uuid::new_v4()), member(500, Uuid::new_v4())]);
        let broken = group("broken", vec![member(100, me), member(600, Uuid::new_v4())]);
        let healthy = group("healthy", vec![member(100, me), member(200, Uuid::new_v4())]);

        let snapshot = StatsSnapshot::new(vec![
            stat(100, today(), Some(9), "Go"),
            stat(200, today(), Some(10), "Go"),
            stat(600, today(), Some(9), "Go"),
        ]);
        let source = FailingFor(MemberKey(600), snapshot);

        let signals = recent_signals(
            &source,
            &[not_mine, broken, healthy.clone()],
            me,
            DateWindow::trailing(today(), 7),
            10,
        )
        .unwrap();
        assert_eq!(signals.len(), 3);
        assert!(signals.iter().all(|signal| signal.group_id == Some(healthy.id)));
    }

    #[test]
    fn recent_signals_fail_on_malformed_records() {
        let me = Uuid::new_v4();
        let circle = group("first", vec![member(100, me), member(200, Uuid::new_v4())]);
        let snapshot = StatsSnapshot::new(vec![stat(100, today(), Some(42), "Go")]);
        let err = recent_signals(&snapshot, &[circle], me, DateWindow::trailing(today(), 7), 10).unwrap_err();
        assert!(matches!(err, SignalError::MalformedRecord { .. }));
    }

    #[test]
    fn rhythms_cover_the_whole_circle() {
        let me = Uuid::new_v4();
        let circle = group("first", vec![member(100, me), member(200, Uuid::new_v4())]);
        let snapshot = StatsSnapshot::new(vec![stat(200, today(), None, "Go")]);
        let rhythms = rhythms_for_group(&snapshot, &circle, me, DateWindow::trailing(today(), 7)).unwrap();
        assert_eq!(rhythms.len(), 2);
        assert_eq!(rhythms[0].github_username, "dev100");
        assert_eq!(rhythms[0].weekly_rhythm.active_days(), 0);
        assert_eq!(rhythms[1].weekly_rhythm.active_days(), 1);
    }

    #[test]
    fn records_a_full_window_back_are_ignored() {
        let me = Uuid::new_v4();
        let circle = group("first", vec![member(100, me), member(200, Uuid::new_v4())]);
        let window = crate::config::SignalConfig::default().window_ending(today());
        let eighth_day = today() - Duration::days(7);
        let snapshot = StatsSnapshot::new(vec![
            stat(100, eighth_day, Some(21), "Go"),
            stat(200, eighth_day, Some(21), "Go"),
        ]);

        assert!(signals_for_group(&snapshot, &circle, me, window).unwrap().is_empty());
        let rhythms = rhythms_for_group(&snapshot, &circle, me, window).unwrap();
        assert!(rhythms.iter().all(|rhythm| rhythm.weekly_rhythm.active_days() == 0));
    }

    #[test]
    fn dashboard_puts_the_account_first() {
        let me = Uuid::new_v4();
        let circle = group("first", vec![member(100, me), member(200, Uuid::new_v4()), member(300, Uuid::new_v4())]);
        let snapshot = StatsSnapshot::new(vec![
            stat(100, today(), Some(9), "Go"),
            stat(300, today() - Duration::days(2), None, "Go"),
            stat(300, today() - Duration::days(1), None, "Go"),
        ]);
        let window = DashboardPeriod::Weekly.window(today(), 7);

        let dashboard = dashboard_for_group(&snapshot, &circle, me, DashboardPeriod::Weekly, window).unwrap();
        assert_eq!(dashboard.my_stats.github_username, "dev100");
        assert_eq!(dashboard.my_stats.total_commits, 4);
        assert_eq!(dashboard.peers.len(), 2);
        assert_eq!(dashboard.peers[0].total_commits, 0);
        assert_eq!(dashboard.peers[1].total_commits, 8);
        assert_eq!(dashboard.peers[1].daily_stats.len(), 2);
    }

    #[test]
    fn dashboard_and_activity_require_membership() {
        let circle = group("first", vec![member(200, Uuid::new_v4())]);
        let window = DateWindow::trailing(today(), 7);
        let stranger = Uuid::new_v4();

        let err = dashboard_for_group(&StatsSnapshot::default(), &circle, stranger, DashboardPeriod::Monthly, window)
            .unwrap_err();
        assert!(matches!(err, SignalError::NotAMember(_)));
        let err = activity_for_group(&StatsSnapshot::default(), &circle, stranger, window).unwrap_err();
        assert!(matches!(err, SignalError::NotAMember(_)));
    }

    #[test]
    fn activity_lists_the_circle_newest_first() {
        let me = Uuid::new_v4();
        let circle = group("first", vec![member(100, me), member(200, Uuid::new_v4())]);
        let snapshot = StatsSnapshot::new(vec![
            stat(100, today() - Duration::days(3), None, "Go"),
            stat(200, today(), None, "Go"),
            stat(900, today(), None, "Go"),
        ]);

        let stream = activity_for_group(&snapshot, &circle, me, DateWindow::trailing(today(), 7)).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream[0].github_username, "dev200");
        assert_eq!(stream[0].date, today());
        assert_eq!(stream[1].repository, "dev100/project");
    }

    #[test]
    fn no_circles_means_no_signals() {
        let signals = recent_signals(
            &StatsSnapshot::default(),
            &[],
            Uuid::new_v4(),
            DateWindow::trailing(today(), 7),
            10,
        )
        .unwrap();
        assert!(signals.is_empty());
    }
}
