//! Index constituents reconstructed from membership events.
//!
//! The latest recorded snapshot is the anchor. Later dates replay events
//! forward from it, earlier dates undo events backward:
//!
//! ```text
//!            undo (reverse order)        apply (date order)
//!   t < anchor  <-----------------  anchor  ----------------->  t > anchor
//! ```
//!
//! An event dated `d` is in effect on `d`. Contradictory events (adding a
//! member, removing a non-member) leave the set unchanged and are counted.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::data::{Action, MembershipEvent, Snapshots};
use super::error::BacktestError;
use crate::utils::date::Date;

pub type Members = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    AlreadyMember,
    NotMember,
}

/// An event that contradicts the set it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub date: Date,
    pub ticker: String,
    pub action: Action,
    pub kind: AnomalyKind,
    /// Found while undoing events before the anchor
    pub backward: bool,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self.action {
            Action::Added => "added",
            Action::Removed => "removed",
        };
        let state = match self.kind {
            AnomalyKind::AlreadyMember => "already a member",
            AnomalyKind::NotMember => "not a member",
        };
        let direction = if self.backward { " (undoing)" } else { "" };
        write!(f, "{} {action} {}: {state}{direction}", self.date, self.ticker)
    }
}

/// Membership at a date plus the anomalies met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    pub members: Members,
    pub anomalies: Vec<Anomaly>,
}

/// Comparison of one recorded snapshot against its reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotCheck {
    pub date: Date,
    pub recorded: usize,
    /// Recorded but not reconstructed
    pub missing: Vec<String>,
    /// Reconstructed but not recorded
    pub unexpected: Vec<String>,
}

impl SnapshotCheck {
    pub fn is_match(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Universe<'a> {
    anchor_date: Date,
    anchor: &'a Members,
    /// Sorted by date
    events: &'a [MembershipEvent],
}

impl<'a> Universe<'a> {
    pub fn new(snapshots: &'a Snapshots, events: &'a [MembershipEvent]) -> Result<Self, BacktestError> {
        let (anchor_date, anchor) = snapshots.last_key_value().ok_or(BacktestError::NoSnapshot)?;
        Ok(Self {
            anchor_date: *anchor_date,
            anchor,
            events,
        })
    }

    pub const fn anchor_date(&self) -> Date {
        self.anchor_date
    }

    /// Constituents in effect on `date`.
    pub fn members_on(&self, date: Date) -> Replay {
        self.replay(date).0
    }

    /// Membership on `date`, plus whether undoing each event between `date`
    /// and the anchor changed the set.
    fn replay(&self, date: Date) -> (Replay, Vec<bool>) {
        let mut replay = Replay {
            members: self.anchor.clone(),
            anomalies: Vec::new(),
        };
        let anchor_end = self.events.partition_point(|e| e.date <= self.anchor_date);

        if date >= self.anchor_date {
            let to = self.events.partition_point(|e| e.date <= date);
            for event in &self.events[anchor_end..to] {
                apply(&mut replay, event);
            }
            return (replay, Vec::new());
        }

        let from = self.events.partition_point(|e| e.date <= date);
        let mut undone = vec![false; anchor_end - from];
        for (i, event) in self.events[from..anchor_end].iter().enumerate().rev() {
            undone[i] = undo(&mut replay, event);
        }
        (replay, undone)
    }

    /// Forward cursor starting at `date`.
    pub fn cursor(&self, date: Date) -> Cursor<'a> {
        let (replay, undone) = self.replay(date);
        let next = self.events.partition_point(|e| e.date <= date);
        Cursor {
            members: replay.members,
            anomalies: replay.anomalies,
            events: self.events,
            next,
            redo_from: next,
            undone,
            current: date,
        }
    }

    /// Compare every recorded snapshot except the anchor with its reconstruction.
    pub fn verify(&self, snapshots: &Snapshots) -> Vec<SnapshotCheck> {
        snapshots
            .iter()
            .filter(|(date, _)| **date != self.anchor_date)
            .map(|(date, recorded)| {
                let rebuilt = self.members_on(*date).members;
                SnapshotCheck {
                    date: *date,
                    recorded: recorded.len(),
                    missing: recorded.difference(&rebuilt).cloned().collect(),
                    unexpected: rebuilt.difference(recorded).cloned().collect(),
                }
            })
            .collect()
    }
}

/// Membership for an ascending sequence of dates, applying each event once.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    members: Members,
    anomalies: Vec<Anomaly>,
    events: &'a [MembershipEvent],
    /// First event not yet applied
    next: usize,
    /// Index of `undone[0]` in `events`
    redo_from: usize,
    /// Events before the anchor that were undone to reach the start date.
    /// Only those are redone; the others already had their anomaly counted.
    undone: Vec<bool>,
    current: Date,
}

impl Cursor<'_> {
    /// Move to `date` and return the members in effect. Dates earlier than
    /// the current position leave the cursor where it is.
    pub fn advance(&mut self, date: Date) -> &Members {
        if date > self.current {
            let mut replay = Replay {
                members: std::mem::take(&mut self.members),
                anomalies: std::mem::take(&mut self.anomalies),
            };
            while let Some(event) = self.events.get(self.next).filter(|e| e.date <= date) {
                let redo = self.undone.get(self.next - self.redo_from).copied();
                if redo.unwrap_or(true) {
                    apply(&mut replay, event);
                }
                self.next += 1;
            }
            self.members = replay.members;
            self.anomalies = replay.anomalies;
            self.current = date;
        }
        &self.members
    }

    pub fn members(&self) -> &Members {
        &self.members
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn into_anomalies(self) -> Vec<Anomaly> {
        self.anomalies
    }
}

fn apply(replay: &mut Replay, event: &MembershipEvent) -> bool {
    let changed = match event.action {
        Action::Added => replay.members.insert(event.ticker.clone()),
        Action::Removed => replay.members.remove(&event.ticker),
    };
    if !changed {
        replay.anomalies.push(anomaly(event, false));
    }
    changed
}

fn undo(replay: &mut Replay, event: &MembershipEvent) -> bool {
    let changed = match event.action {
        Action::Added => replay.members.remove(&event.ticker),
        Action::Removed => replay.members.insert(event.ticker.clone()),
    };
    if !changed {
        replay.anomalies.push(anomaly(event, true));
    }
    changed
}

fn anomaly(event: &MembershipEvent, backward: bool) -> Anomaly {
    // Forward: a failed add means the ticker was present. Backward the
    // roles swap: undoing an add fails when the ticker is absent.
    let kind = match (event.action, backward) {
        (Action::Added, false) | (Action::Removed, true) => AnomalyKind::AlreadyMember,
        (Action::Removed, false) | (Action::Added, true) => AnomalyKind::NotMember,
    };
    Anomaly {
        date: event.date,
        ticker: event.ticker.clone(),
        action: event.action,
        kind,
        backward,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Date {
        Date::parse(s).unwrap()
    }

    fn set(tickers: &[&str]) -> Members {
        tickers.iter().map(|t| (*t).to_owned()).collect()
    }

    fn events() -> Vec<MembershipEvent> {
        vec![
            MembershipEvent::new(d("2020-02-03"), "DDD", Action::Added),
            MembershipEvent::new(d("2020-02-03"), "AAA", Action::Removed),
            MembershipEvent::new(d("2020-03-02"), "EEE", Action::Added),
            MembershipEvent::new(d("2020-04-01"), "BBB", Action::Removed),
            MembershipEvent::new(d("2020-05-01"), "FFF", Action::Added),
        ]
    }

    fn snapshots() -> Snapshots {
        Snapshots::from([
            (d("2020-01-15"), set(&["AAA", "BBB", "CCC"])),
            (d("2020-02-03"), set(&["BBB", "CCC", "DDD"])),
            (d("2020-04-15"), set(&["CCC", "DDD", "EEE"])),
        ])
    }

    #[test]
    fn test_backward_replay_matches_snapshots() {
        let events = events();
        let snapshots = snapshots();
        let universe = Universe::new(&snapshots, &events).unwrap();
        assert_eq!(universe.anchor_date(), d("2020-04-15"));

        let checks = universe.verify(&snapshots);
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(SnapshotCheck::is_match), "{checks:?}");

        // The day before an event, it has not happened yet
        assert_eq!(
            universe.members_on(d("2020-03-01")).members,
            set(&["BBB", "CCC", "DDD"])
        );
        assert_eq!(
            universe.members_on(d("2020-03-02")).members,
            set(&["BBB", "CCC", "DDD", "EEE"])
        );
    }

    #[test]
    fn test_forward_replay() {
        let events = events();
        let snapshots = snapshots();
        let universe = Universe::new(&snapshots, &events).unwrap();
        let replay = universe.members_on(d("2020-06-01"));
        assert_eq!(replay.members, set(&["CCC", "DDD", "EEE", "FFF"]));
        assert!(replay.anomalies.is_empty());
    }

    #[test]
    fn test_mismatch_reported() {
        let events = events();
        let mut snapshots = snapshots();
        snapshots.insert(d("2020-01-15"), set(&["AAA", "CCC", "ZZZ"]));
        let universe = Universe::new(&snapshots, &events).unwrap();

        let check = &universe.verify(&snapshots)[0];
        assert!(!check.is_match());
        assert_eq!(check.missing, ["ZZZ"]);
        assert_eq!(check.unexpected, ["BBB"]);
    }

    #[test]
    fn test_anomalies_counted_not_fatal() {
        let events = vec![
            MembershipEvent::new(d("2020-02-01"), "AAA", Action::Added),
            MembershipEvent::new(d("2020-06-01"), "ZZZ", Action::Removed),
        ];
        let snapshots = Snapshots::from([(d("2020-03-01"), set(&["AAA"]))]);
        let universe = Universe::new(&snapshots, &events).unwrap();

        let before = universe.members_on(d("2020-01-01"));
        assert!(before.members.is_empty());
        assert!(before.anomalies.is_empty());

        let after = universe.members_on(d("2020-07-01"));
        assert_eq!(after.members, set(&["AAA"]));
        assert_eq!(after.anomalies.len(), 1);
        assert_eq!(after.anomalies[0].kind, AnomalyKind::NotMember);
        assert_eq!(after.anomalies[0].to_string(), "2020-06-01 removed ZZZ: not a member");
    }

    #[test]
    fn test_cursor_matches_point_queries() {
        let events = events();
        let snapshots = snapshots();
        let universe = Universe::new(&snapshots, &events).unwrap();

        let dates = ["2020-01-20", "2020-02-03", "2020-03-15", "2020-04-01", "2020-05-04"];
        let mut cursor = universe.cursor(d(dates[0]));
        for date in dates {
            let date = d(date);
            assert_eq!(cursor.advance(date), &universe.members_on(date).members, "{date}");
        }
        assert!(cursor.anomalies().is_empty());
    }

    #[test]
    fn test_cursor_with_inconsistent_events_keeps_anchor() {
        let events = vec![
            MembershipEvent::new(d("2020-01-10"), "CCC", Action::Added),
            MembershipEvent::new(d("2020-02-01"), "BBB", Action::Added),
            MembershipEvent::new(d("2020-02-15"), "AAA", Action::Removed),
            MembershipEvent::new(d("2020-04-01"), "AAA", Action::Added),
        ];
        let snapshots = Snapshots::from([(d("2020-03-01"), set(&["AAA", "CCC"]))]);
        let universe = Universe::new(&snapshots, &events).unwrap();

        let dates = ["2020-01-01", "2020-01-10", "2020-02-01", "2020-02-20", "2020-03-01", "2020-04-02"];
        let mut cursor = universe.cursor(d(dates[0]));
        for date in dates {
            let date = d(date);
            assert_eq!(cursor.advance(date), &universe.members_on(date).members, "{date}");
        }
        assert_eq!(cursor.members(), &set(&["AAA", "CCC"]));

        // Undoing the add of BBB and the removal of AAA both contradict
        // the anchor; adding AAA after it does too.
        let anomalies = cursor.into_anomalies();
        assert_eq!(anomalies.len(), 3);
        assert_eq!(anomalies.iter().filter(|a| a.backward).count(), 2);
    }

    #[test]
    fn test_no_snapshot() {
        let empty = Snapshots::new();
        assert!(matches!(
            Universe::new(&empty, &[]),
            Err(BacktestError::NoSnapshot)
        ));
    }
}
