use crate::error::{Result, SignalError};
use crate::models::{CommitStatRecord, DateWindow, MemberKey};

/// Lookup of daily commit statistics for a set of members.
///
/// Implementations return complete results; retries and paging are theirs.
pub trait CommitStatsSource {
    fn commit_stats(&self, members: &[MemberKey], window: DateWindow) -> Result<Vec<CommitStatRecord>>;
}

/// Commit statistics already loaded into memory.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    records: Vec<CommitStatRecord>,
}

impl StatsSnapshot {
    pub fn new(records: Vec<CommitStatRecord>) -> Self {
        Self { records }
    }
}

impl CommitStatsSource for StatsSnapshot {
    fn commit_stats(&self, members: &[MemberKey], window: DateWindow) -> Result<Vec<CommitStatRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| members.contains(&record.member_key) && window.contains(record.date))
            .cloned()
            .collect())
    }
}

/// Statistics fetched ahead of time, one batch per circle's member list.
///
/// A batch whose fetch failed keeps its error and reports it as `DataFetch`
/// when that member list is asked for.
#[derive(Debug, Default)]
pub struct PrefetchedStats {
    batches: Vec<(Vec<MemberKey>, std::result::Result<StatsSnapshot, String>)>,
}

impl PrefetchedStats {
    pub fn insert(
        &mut self,
        members: Vec<MemberKey>,
        batch: std::result::Result<Vec<CommitStatRecord>, String>,
    ) {
        self.batches.push((members, batch.map(StatsSnapshot::new)));
    }
}

impl CommitStatsSource for PrefetchedStats {
    fn commit_stats(&self, members: &[MemberKey], window: DateWindow) -> Result<Vec<CommitStatRecord>> {
        match self.batches.iter().find(|(keys, _)| keys.as_slice() == members) {
            Some((_, Ok(snapshot))) => snapshot.commit_stats(members, window),
            Some((_, Err(reason))) => Err(SignalError::DataFetch(reason.clone())),
            None => Err(SignalError::DataFetch(format!(
                "no statistics loaded for {} members",
                members.len()
            ))),
        }
    }
}
