use std::collections::BTreeMap;
use std::fmt::Write;

use crate::models::{DateWindow, Signal, SignalKind};
use crate::rhythm::MemberRhythm;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalKindSummary {
    pub kind: SignalKind,
    pub count: usize,
    pub peer_count: usize,
}

pub fn summarize_by_kind(signals: &[Signal]) -> Vec<SignalKindSummary> {
    let mut map: BTreeMap<SignalKind, (usize, usize)> = BTreeMap::new();

    for signal in signals {
        let entry = map.entry(signal.kind).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += signal.peers.len();
    }

    let mut summaries: Vec<SignalKindSummary> = map
        .into_iter()
        .map(|(kind, (count, peer_count))| SignalKindSummary {
            kind,
            count,
            peer_count,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

fn peer_names(signal: &Signal) -> String {
    signal
        .peers
        .iter()
        .map(|peer| peer.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A circle's section of the report.
pub struct CircleSection<'a> {
    pub name: &'a str,
    pub signals: &'a [Signal],
    pub rhythms: &'a [MemberRhythm],
}

pub fn build_report(
    account_label: &str,
    window: DateWindow,
    recent: &[Signal],
    circles: &[CircleSection<'_>],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Circle Signals Report");
    let _ = writeln!(output, "Generated for {} (commits in {})", account_label, window);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Signals");

    if recent.is_empty() {
        let _ = writeln!(output, "No signals detected for this window.");
    } else {
        for signal in recent {
            let _ = writeln!(
                output,
                "- {} [{}] {} with {} ({})",
                signal.date,
                signal.kind,
                signal.detail,
                peer_names(signal),
                signal.group_name.as_deref().unwrap_or("-")
            );
        }
    }

    for circle in circles {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Circle: {}", circle.name);
        let _ = writeln!(output);
        let _ = writeln!(output, "### Signal Mix");

        let summaries = summarize_by_kind(circle.signals);
        if summaries.is_empty() {
            let _ = writeln!(output, "No signals detected for this window.");
        } else {
            for summary in &summaries {
                let _ = writeln!(
                    output,
                    "- {}: {} signals ({} peer mentions)",
                    summary.kind, summary.count, summary.peer_count
                );
            }
        }

        let _ = writeln!(output);
        let _ = writeln!(output, "### Weekly Rhythm");
        if circle.rhythms.is_empty() {
            let _ = writeln!(output, "No members to chart.");
        } else {
            for rhythm in circle.rhythms {
                let week = &rhythm.weekly_rhythm;
                let days: String = [week.mon, week.tue, week.wed, week.thu, week.fri, week.sat, week.sun]
                    .iter()
                    .map(|active| if *active { '#' } else { '.' })
                    .collect();
                let _ = writeln!(
                    output,
                    "- {} `{}` {}",
                    rhythm.github_username,
                    days,
                    rhythm.pattern.label()
                );
            }
        }
    }

    output
}
