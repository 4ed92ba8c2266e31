//! Step journal
//!
//! A bounded audit trail of committed and rolled-back transactions, stamped
//! with wall-clock time.

use crate::store::{CommitReport, TxId};
use chrono::{DateTime, Utc};
use gloam_core::Slice;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Configuration for the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Whether entries are recorded at all
    pub enabled: bool,
    /// Maximum number of entries to keep (0 = unlimited)
    pub max_entries: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 256,
        }
    }
}

/// A recorded transaction outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEntry {
    Committed {
        tx: TxId,
        reason: String,
        version: u64,
        touched: Vec<Slice>,
        events: usize,
        repairs: usize,
        at: DateTime<Utc>,
    },
    RolledBack {
        tx: TxId,
        reason: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl JournalEntry {
    pub fn tx(&self) -> TxId {
        match self {
            JournalEntry::Committed { tx, .. } | JournalEntry::RolledBack { tx, .. } => *tx,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            JournalEntry::Committed { at, .. } | JournalEntry::RolledBack { at, .. } => *at,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JournalEntry::RolledBack { .. })
    }
}

/// Counts over the journal's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalStats {
    pub commits: u64,
    pub rollbacks: u64,
    pub retained: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    config: JournalConfig,
    entries: VecDeque<JournalEntry>,
    commits: u64,
    rollbacks: u64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: JournalConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn record_commit(&mut self, reason: &str, report: &CommitReport) {
        self.commits += 1;
        self.push(JournalEntry::Committed {
            tx: report.tx,
            reason: reason.to_string(),
            version: report.version,
            touched: report.touched.iter().collect(),
            events: report.events.len(),
            repairs: report.issues.len(),
            at: Utc::now(),
        });
    }

    pub fn record_rollback(&mut self, tx: TxId, reason: &str, error: &dyn std::fmt::Display) {
        self.rollbacks += 1;
        self.push(JournalEntry::RolledBack {
            tx,
            reason: reason.to_string(),
            error: error.to_string(),
            at: Utc::now(),
        });
    }

    fn push(&mut self, entry: JournalEntry) {
        if !self.config.enabled {
            return;
        }
        self.entries.push_back(entry);
        if self.config.max_entries > 0 {
            while self.entries.len() > self.config.max_entries {
                self.entries.pop_front();
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.back()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(|e| e.is_failure())
    }

    /// Entries recorded at or after `since`
    pub fn entries_since(&self, since: DateTime<Utc>) -> Vec<&JournalEntry> {
        self.entries.iter().filter(|e| e.at() >= since).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> JournalStats {
        JournalStats {
            commits: self.commits,
            rollbacks: self.rollbacks,
            retained: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloam_core::SliceSet;

    fn report(tx: u64) -> CommitReport {
        let mut touched = SliceSet::new();
        touched.insert(Slice::Time);
        CommitReport {
            tx: TxId(tx),
            version: tx,
            touched,
            clones: 1,
            issues: Vec::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_records_and_bounds() {
        let mut journal = Journal::with_config(JournalConfig {
            enabled: true,
            max_entries: 2,
        });
        journal.record_commit("step", &report(1));
        journal.record_rollback(TxId(2), "step", &"unknown map");
        journal.record_commit("step", &report(3));

        assert_eq!(journal.entries().count(), 2);
        assert_eq!(journal.entries().next().map(|e| e.tx()), Some(TxId(2)));
        assert_eq!(journal.failures().count(), 1);
        assert_eq!(
            journal.stats(),
            JournalStats {
                commits: 2,
                rollbacks: 1,
                retained: 2
            }
        );
        match journal.last() {
            Some(JournalEntry::Committed { touched, .. }) => {
                assert_eq!(touched, &vec![Slice::Time])
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_disabled_journal_still_counts() {
        let mut journal = Journal::with_config(JournalConfig {
            enabled: false,
            max_entries: 0,
        });
        journal.record_commit("step", &report(1));
        assert!(journal.last().is_none());
        assert_eq!(journal.stats().commits, 1);
    }

    #[test]
    fn test_entries_since() {
        let mut journal = Journal::new();
        let start = Utc::now();
        journal.record_commit("step", &report(1));
        assert_eq!(journal.entries_since(start).len(), 1);
    }
}
