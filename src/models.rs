use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, SignalError};

/// GitHub user id joining a local account to its commit statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MemberKey(pub i64);

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of daily, per-repository commit statistics.
#[derive(Debug, Clone)]
pub struct CommitStatRecord {
    pub member_key: MemberKey,
    pub date: NaiveDate,
    pub repository: String,
    pub commit_count: i32,
    pub primary_hour: Option<u8>,
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub member_key: MemberKey,
    pub display_name: String,
    pub avatar_url: String,
    /// Local account this GitHub identity belongs to.
    pub account_id: Uuid,
}

/// A circle and the profiles of everyone in it.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<MemberProfile>,
}

impl Group {
    pub fn member_keys(&self) -> Vec<MemberKey> {
        self.members.iter().map(|member| member.member_key).collect()
    }

    pub fn member_for_account(&self, account_id: Uuid) -> Option<&MemberProfile> {
        self.members
            .iter()
            .find(|member| member.account_id == account_id)
    }
}

/// Folded commit activity of one member on one date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAggregate {
    pub has_commit: bool,
    pub hours: BTreeSet<u8>,
    pub languages: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    SameDay,
    SameHour,
    SameLanguage,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::SameDay => "same_day",
            SignalKind::SameHour => "same_hour",
            SignalKind::SameLanguage => "same_language",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub name: String,
    pub avatar_url: String,
}

impl From<&MemberProfile> for Peer {
    fn from(profile: &MemberProfile) -> Self {
        Self {
            name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// A coincidence between the requesting member and one or more peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub date: NaiveDate,
    pub peers: Vec<Peer>,
    pub detail: String,
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
}

impl Signal {
    pub fn new(kind: SignalKind, date: NaiveDate, detail: String) -> Self {
        Self {
            kind,
            date,
            peers: Vec::new(),
            detail,
            group_id: None,
            group_name: None,
        }
    }
}

/// Inclusive range of calendar dates a computation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The last `days` calendar days up to and including `end` (at least one).
    ///
    /// Spans that reach past the calendar start at `NaiveDate::MIN`.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        let back = days.max(1) - 1;
        let start = Duration::try_days(back)
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// From the first of `end`'s month through `end`.
    pub fn month_to_date(end: NaiveDate) -> Self {
        Self {
            start: end.with_day(1).unwrap_or(end),
            end,
        }
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Parses an ISO-8601 calendar date coming from outside the core.
pub fn parse_stat_date(member_key: MemberKey, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
        SignalError::MalformedRecord {
            member: member_key,
            reason: format!("unparseable date {raw:?}: {err}"),
        }
    })
}
