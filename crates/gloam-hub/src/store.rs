//! Transactional state store
//!
//! The store owns the canonical [`GameState`]. A step works on a
//! [`Transaction`], which wraps a copy-on-write [`Draft`] of that state:
//!
//! ```text
//! begin ──► Transaction (Draft) ──► commit ──► canonical = draft tree
//!                              └──► rollback ──► draft dropped
//! ```
//!
//! Only one transaction may be open at a time. A failed commit leaves the
//! transaction open; it must still be rolled back before the next `begin`.

use crate::validate::{Issue, ValidationMode, Validator};
use crate::{Error, Result};
use gloam_core::{Draft, GameState, SimEvent, SliceSet, TimeConfig};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Identifier of a transaction within one store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

/// An open draft of the canonical state
///
/// Dereferences to [`Draft`], so slices are read and touched directly on the
/// transaction.
#[derive(Debug)]
pub struct Transaction {
    id: TxId,
    reason: String,
    draft: Draft,
    closed: bool,
}

impl Transaction {
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Why the transaction was opened, for logs and the journal
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the transaction was committed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Deref for Transaction {
    type Target = Draft;

    fn deref(&self) -> &Draft {
        &self.draft
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub tx: TxId,
    /// Store version after this commit
    pub version: u64,
    pub touched: SliceSet,
    /// Slice copies made by the transaction
    pub clones: u32,
    /// Violations repaired by lenient validation
    pub issues: Vec<Issue>,
    /// Events raised during the transaction, in emission order
    pub events: Vec<SimEvent>,
}

/// Owner of the canonical state tree
#[derive(Debug)]
pub struct Store {
    canonical: GameState,
    version: u64,
    next_tx: u64,
    open: Option<TxId>,
    validator: Validator,
}

impl Store {
    pub fn new(state: GameState, validator: Validator) -> Self {
        Self {
            canonical: state,
            version: 0,
            next_tx: 1,
            open: None,
            validator,
        }
    }

    /// A store validating against the default clock in the default mode
    pub fn with_state(state: GameState) -> Self {
        Self::new(
            state,
            Validator::new(ValidationMode::default(), TimeConfig::default()),
        )
    }

    /// The canonical state
    pub fn state(&self) -> &GameState {
        &self.canonical
    }

    /// Number of successful commits
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn open_transaction(&self) -> Option<TxId> {
        self.open
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut Validator {
        &mut self.validator
    }

    /// Open a transaction over the canonical state
    pub fn begin(&mut self, reason: impl Into<String>) -> Result<Transaction> {
        if let Some(open) = self.open {
            return Err(Error::TransactionOpen { open });
        }
        let id = TxId(self.next_tx);
        self.next_tx += 1;
        self.open = Some(id);
        let reason = reason.into();
        log::trace!("begin {:?} ({})", id, reason);
        Ok(Transaction {
            id,
            reason,
            draft: Draft::new(&self.canonical),
            closed: false,
        })
    }

    /// Validate the draft and make it canonical
    ///
    /// On error the canonical tree is unchanged and the transaction stays
    /// open; call [`Store::rollback`] before reusing the store.
    pub fn commit(&mut self, tx: &mut Transaction) -> Result<CommitReport> {
        if tx.closed || self.open != Some(tx.id) {
            return Err(Error::StaleTransaction(tx.id));
        }
        let issues = self.validator.validate(&mut tx.draft)?;

        self.canonical = tx.draft.state().clone();
        self.version += 1;
        self.open = None;
        tx.closed = true;

        let report = CommitReport {
            tx: tx.id,
            version: self.version,
            touched: tx.draft.touched(),
            clones: tx.draft.clone_count(),
            issues,
            events: tx.draft.take_events(),
        };
        log::trace!(
            "commit {:?} ({}) -> version {}, {} slices touched",
            tx.id,
            tx.reason,
            self.version,
            report.touched.len()
        );
        Ok(report)
    }

    /// Discard the transaction
    ///
    /// Never fails. Rolling back a committed transaction only drops it.
    pub fn rollback(&mut self, tx: Transaction) {
        if self.open == Some(tx.id) {
            self.open = None;
            log::debug!(
                "rollback {:?} ({}), {} events dropped",
                tx.id,
                tx.reason,
                tx.draft.events().len()
            );
        }
    }
}
