use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{CommitStatRecord, DateWindow, MemberKey, MemberProfile};

/// One repository's commits by one member on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub github_username: String,
    pub avatar_url: String,
    pub repository: String,
    pub commit_count: i32,
    pub date: NaiveDate,
}

/// Raw records of the circle inside `window`, newest day first.
///
/// Items on the same day are ordered by username, then repository.
pub fn activity_stream(
    records: &[CommitStatRecord],
    profiles: &BTreeMap<MemberKey, MemberProfile>,
    window: DateWindow,
) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = records
        .iter()
        .filter(|record| window.contains(record.date))
        .filter_map(|record| {
            let profile = profiles.get(&record.member_key)?;
            Some(ActivityItem {
                github_username: profile.display_name.clone(),
                avatar_url: profile.avatar_url.clone(),
                repository: record.repository.clone(),
                commit_count: record.commit_count,
                date: record.date,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.github_username.cmp(&b.github_username))
            .then_with(|| a.repository.cmp(&b.repository))
    });
    items
}
