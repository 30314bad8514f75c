use std::collections::BTreeMap;

use chrono::{Datelike, Weekday};
use serde::Serialize;

use crate::index::CommitDayIndex;
use crate::models::{MemberKey, MemberProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmPattern {
    /// Commits on most days of the week.
    Steady,
    /// Few weekday commits, some weekend ones.
    Weekend,
    /// Everything else.
    Burst,
}

impl RhythmPattern {
    pub fn label(&self) -> &'static str {
        match self {
            RhythmPattern::Steady => "安定型",
            RhythmPattern::Weekend => "週末型",
            RhythmPattern::Burst => "バースト型",
        }
    }
}

/// Which weekdays had at least one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyRhythm {
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
    pub sun: bool,
}

impl WeeklyRhythm {
    fn mark(&mut self, weekday: Weekday) {
        match weekday {
            Weekday::Mon => self.mon = true,
            Weekday::Tue => self.tue = true,
            Weekday::Wed => self.wed = true,
            Weekday::Thu => self.thu = true,
            Weekday::Fri => self.fri = true,
            Weekday::Sat => self.sat = true,
            Weekday::Sun => self.sun = true,
        }
    }

    pub fn weekday_count(&self) -> usize {
        [self.mon, self.tue, self.wed, self.thu, self.fri]
            .iter()
            .filter(|active| **active)
            .count()
    }

    pub fn weekend_count(&self) -> usize {
        [self.sat, self.sun].iter().filter(|active| **active).count()
    }

    pub fn active_days(&self) -> usize {
        self.weekday_count() + self.weekend_count()
    }

    pub fn pattern(&self) -> RhythmPattern {
        classify_pattern(self.active_days(), self.weekday_count(), self.weekend_count())
    }
}

pub fn classify_pattern(active_days: usize, weekday_count: usize, weekend_count: usize) -> RhythmPattern {
    if active_days >= 5 {
        return RhythmPattern::Steady;
    }
    if weekday_count <= 2 && weekend_count >= 1 {
        return RhythmPattern::Weekend;
    }
    RhythmPattern::Burst
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRhythm {
    pub github_username: String,
    pub avatar_url: String,
    pub pattern: RhythmPattern,
    pub weekly_rhythm: WeeklyRhythm,
}

/// Weekly rhythm of every member in `index`, `self_key` first.
pub fn weekly_rhythms(
    index: &CommitDayIndex,
    self_key: MemberKey,
    profiles: &BTreeMap<MemberKey, MemberProfile>,
) -> Vec<MemberRhythm> {
    let ordered = std::iter::once(self_key).chain(index.members().filter(|key| *key != self_key));

    ordered
        .filter_map(|key| {
            let profile = profiles.get(&key)?;
            let mut rhythm = WeeklyRhythm::default();
            for (date, day) in index.days_for(key).into_iter().flatten() {
                if day.has_commit {
                    rhythm.mark(date.weekday());
                }
            }
            Some(MemberRhythm {
                github_username: profile.display_name.clone(),
                avatar_url: profile.avatar_url.clone(),
                pattern: rhythm.pattern(),
                weekly_rhythm: rhythm,
            })
        })
        .collect()
}
