use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{Result, SignalError};
use crate::models::{CommitStatRecord, DayAggregate, MemberKey};

/// Per-member, per-date view of commit activity.
#[derive(Debug, Clone, Default)]
pub struct CommitDayIndex {
    days: BTreeMap<MemberKey, BTreeMap<NaiveDate, DayAggregate>>,
}

impl CommitDayIndex {
    pub fn days_for(&self, member_key: MemberKey) -> Option<&BTreeMap<NaiveDate, DayAggregate>> {
        self.days.get(&member_key)
    }

    pub fn day(&self, member_key: MemberKey, date: NaiveDate) -> Option<&DayAggregate> {
        self.days.get(&member_key)?.get(&date)
    }

    /// Members in ascending key order.
    pub fn members(&self) -> impl Iterator<Item = MemberKey> + '_ {
        self.days.keys().copied()
    }

    /// Members other than `self_key` with commits on `date`, ascending by key.
    pub fn active_peers(&self, self_key: MemberKey, date: NaiveDate) -> Vec<MemberKey> {
        self.days
            .iter()
            .filter(|(key, _)| **key != self_key)
            .filter(|(_, days)| days.get(&date).is_some_and(|day| day.has_commit))
            .map(|(key, _)| *key)
            .collect()
    }
}

/// Folds per-repository records into one aggregate per (member, date).
///
/// Every key in `member_keys` gets an entry even without records. Records for
/// members outside that set are ignored so one circle never sees another's data.
pub fn build_index(records: &[CommitStatRecord], member_keys: &[MemberKey]) -> Result<CommitDayIndex> {
    let mut days: BTreeMap<MemberKey, BTreeMap<NaiveDate, DayAggregate>> = member_keys
        .iter()
        .map(|key| (*key, BTreeMap::new()))
        .collect();

    for record in records {
        let Some(member_days) = days.get_mut(&record.member_key) else {
            continue;
        };

        if let Some(hour) = record.primary_hour {
            if hour > 23 {
                return Err(SignalError::MalformedRecord {
                    member: record.member_key,
                    reason: format!(
                        "primary hour {hour} out of range for {} on {}",
                        record.repository, record.date
                    ),
                });
            }
        }

        let day = member_days.entry(record.date).or_default();
        // A record marks the day active even when its commit count is zero.
        day.has_commit = true;
        if let Some(hour) = record.primary_hour {
            day.hours.insert(hour);
        }
        if let Some(language) = record.language.as_deref().filter(|lang| !lang.is_empty()) {
            day.languages.insert(language.to_string());
        }
    }

    Ok(CommitDayIndex { days })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn record(member: i64, day: u32, repo: &str, hour: Option<u8>, lang: &str) -> CommitStatRecord {
        CommitStatRecord {
            member_key: MemberKey(member),
            date: date(day),
            repository: repo.to_string(),
            commit_count: 3,
            primary_hour: hour,
            language: Some(lang.to_string()),
        }
    }

    #[test]
    fn folds_repositories_into_one_day() {
        let records = vec![
            record(100, 14, "me/api", Some(9), "Go"),
            record(100, 14, "me/web", Some(21), "TypeScript"),
            record(100, 14, "me/docs", None, ""),
        ];
        let index = build_index(&records, &[MemberKey(100)]).unwrap();

        let day = index.day(MemberKey(100), date(14)).unwrap();
        assert!(day.has_commit);
        assert_eq!(day.hours.iter().copied().collect::<Vec<_>>(), vec![9, 21]);
        assert_eq!(
            day.languages.iter().cloned().collect::<Vec<_>>(),
            vec!["Go".to_string(), "TypeScript".to_string()]
        );
    }

    #[test]
    fn seeds_members_without_records() {
        let index = build_index(&[], &[MemberKey(100), MemberKey(200)]).unwrap();
        assert!(index.days_for(MemberKey(200)).unwrap().is_empty());
        assert!(index.days_for(MemberKey(300)).is_none());
    }

    #[test]
    fn zero_commit_record_still_marks_activity() {
        let mut zero = record(100, 10, "me/api", None, "Rust");
        zero.commit_count = 0;
        let index = build_index(&[zero], &[MemberKey(100)]).unwrap();
        assert!(index.day(MemberKey(100), date(10)).unwrap().has_commit);
    }

    #[test]
    fn ignores_members_outside_the_set() {
        let records = vec![record(300, 14, "other/repo", Some(10), "Rust")];
        let index = build_index(&records, &[MemberKey(100)]).unwrap();
        assert!(index.days_for(MemberKey(300)).is_none());
        assert_eq!(index.members().count(), 1);
    }

    #[test]
    fn out_of_range_hour_fails_the_build() {
        let records = vec![
            record(100, 14, "me/api", Some(10), "Go"),
            record(100, 14, "me/web", Some(24), "Go"),
        ];
        let err = build_index(&records, &[MemberKey(100)]).unwrap_err();
        assert!(matches!(err, SignalError::MalformedRecord { member, .. } if member == MemberKey(100)));
    }

    #[test]
    fn active_peers_excludes_self_and_idle_members() {
        let records = vec![
            record(100, 14, "a", None, "Go"),
            record(300, 14, "b", None, "Go"),
            record(200, 14, "c", None, "Go"),
            record(400, 13, "d", None, "Go"),
        ];
        let keys = [MemberKey(100), MemberKey(200), MemberKey(300), MemberKey(400)];
        let index = build_index(&records, &keys).unwrap();
        assert_eq!(
            index.active_peers(MemberKey(100), date(14)),
            vec![MemberKey(200), MemberKey(300)]
        );
    }
}
