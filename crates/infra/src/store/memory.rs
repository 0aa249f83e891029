use std::sync::RwLock;

use tally_core::{DomainError, DomainResult};

use super::{Tables, Txn};

/// In-memory transactional store.
///
/// Stand-in for the relational store in tests/dev. Transactions snapshot
/// the tables, stage writes, and commit under the write lock with per-row
/// version verification; concurrent writers lose with `Conflict` and retry
/// from fresh state.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> DomainResult<Txn> {
        let tables = self
            .tables
            .read()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;
        Ok(Txn::from_snapshot(tables.clone()))
    }

    pub fn commit(&self, txn: Txn) -> DomainResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;

        // Verify every table before applying any: all-or-nothing.
        txn.ledger_accounts.verify(&tables.ledger_accounts)?;
        txn.accounts.verify(&tables.accounts)?;
        txn.journal_entries.verify(&tables.journal_entries)?;
        txn.postings.verify(&tables.postings)?;
        txn.holds.verify(&tables.holds)?;
        txn.adjustments.verify(&tables.adjustments)?;
        txn.network_messages.verify(&tables.network_messages)?;
        txn.activities.verify(&tables.activities)?;
        txn.limits.verify(&tables.limits)?;

        txn.ledger_accounts.apply(&mut tables.ledger_accounts);
        txn.accounts.apply(&mut tables.accounts);
        txn.journal_entries.apply(&mut tables.journal_entries);
        txn.postings.apply(&mut tables.postings);
        txn.holds.apply(&mut tables.holds);
        txn.adjustments.apply(&mut tables.adjustments);
        txn.network_messages.apply(&mut tables.network_messages);
        txn.activities.apply(&mut tables.activities);
        txn.limits.apply(&mut tables.limits);

        Ok(())
    }

    /// Run one unit of work: begin, apply `f`, commit.
    ///
    /// No retry here — on `Conflict` the caller re-reads and re-decides.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Txn) -> DomainResult<T>) -> DomainResult<T> {
        let mut txn = self.begin()?;
        let out = f(&mut txn)?;
        self.commit(txn)?;
        Ok(out)
    }
}
