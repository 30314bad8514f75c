//! Pairwise co-activity detection between one member and the rest of a circle
//!
//! Three kinds of coincidence are reported for every date on which the
//! requesting member committed:
//!
//! * same day: one signal per date listing every other active member
//! * same hour: primary commit hours within one hour of each other
//! * same language: a language both sides used that day
//!
//! Same-hour and same-language signals name a single peer each. Duplicates are
//! collapsed on `(kind, date, detail)`.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{Result, SignalError};
use crate::index::CommitDayIndex;
use crate::models::{MemberKey, MemberProfile, Peer, Signal, SignalKind};

pub const SAME_DAY_DETAIL: &str = "同じ日にコミット";
/// Largest hour difference still counted as committing at the same time.
pub const HOUR_TOLERANCE: u8 = 1;

pub fn hour_detail(hour: u8) -> String {
    format!("{hour}時台")
}

type SignalKey = (SignalKind, NaiveDate, String);

#[derive(Default)]
struct SignalCollector {
    signals: Vec<Signal>,
    seen: HashSet<SignalKey>,
}

impl SignalCollector {
    fn contains(&self, kind: SignalKind, date: NaiveDate, detail: &str) -> bool {
        self.seen.contains(&(kind, date, detail.to_string()))
    }

    /// Records a signal unless one with the same identity already exists.
    fn push(&mut self, signal: Signal) {
        let key = (signal.kind, signal.date, signal.detail.clone());
        if self.seen.insert(key) {
            self.signals.push(signal);
        }
    }
}

fn peer_for(profiles: &BTreeMap<MemberKey, MemberProfile>, key: MemberKey) -> Peer {
    profiles.get(&key).map(Peer::from).unwrap_or_else(|| Peer {
        name: key.to_string(),
        avatar_url: String::new(),
    })
}

/// Detects signals between `self_key` and every other member in `index`.
///
/// The result is ordered by date, newest first; signals on the same date keep
/// the order in which they were found.
pub fn detect_signals(
    index: &CommitDayIndex,
    self_key: MemberKey,
    profiles: &BTreeMap<MemberKey, MemberProfile>,
) -> Result<Vec<Signal>> {
    let my_days = match index.days_for(self_key) {
        Some(days) if profiles.contains_key(&self_key) => days,
        _ => return Err(SignalError::NotAMember(format!("member {self_key}"))),
    };

    let mut collector = SignalCollector::default();

    for (date, my_day) in my_days {
        if !my_day.has_commit {
            continue;
        }

        for peer_key in index.active_peers(self_key, *date) {
            let Some(peer_day) = index.day(peer_key, *date) else {
                continue;
            };
            let peer = peer_for(profiles, peer_key);

            if !collector.contains(SignalKind::SameDay, *date, SAME_DAY_DETAIL) {
                let mut same_day = Signal::new(SignalKind::SameDay, *date, SAME_DAY_DETAIL.to_string());
                same_day.peers = index
                    .active_peers(self_key, *date)
                    .into_iter()
                    .map(|key| peer_for(profiles, key))
                    .collect();
                collector.push(same_day);
            }

            for my_hour in &my_day.hours {
                for peer_hour in &peer_day.hours {
                    if my_hour.abs_diff(*peer_hour) > HOUR_TOLERANCE {
                        continue;
                    }
                    let mut signal = Signal::new(SignalKind::SameHour, *date, hour_detail(*peer_hour));
                    signal.peers.push(peer.clone());
                    collector.push(signal);
                }
            }

            for language in my_day.languages.intersection(&peer_day.languages) {
                let mut signal = Signal::new(SignalKind::SameLanguage, *date, language.clone());
                signal.peers.push(peer.clone());
                collector.push(signal);
            }
        }
    }

    let mut signals = collector.signals;
    sort_newest_first(&mut signals);
    debug!(member = %self_key, count = signals.len(), "detected signals");
    Ok(signals)
}

/// Stable sort by date, newest first.
pub fn sort_newest_first(signals: &mut [Signal]) {
    signals.sort_by(|a, b| b.date.cmp(&a.date));
}
