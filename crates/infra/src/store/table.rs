use std::collections::HashMap;
use std::hash::Hash;

use tally_core::{DomainError, DomainResult, ExpectedVersion};

/// Row-version access for optimistic concurrency.
pub trait Versioned: Clone {
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

/// One table's view inside a transaction: snapshot + staged writes.
///
/// The expected version of every staged row is pinned when the row is first
/// written in this transaction (`None` = insert, expected absent) and
/// verified against the live table at commit.
#[derive(Debug)]
pub(crate) struct TxnTable<K, V> {
    snapshot: HashMap<K, V>,
    staged: HashMap<K, V>,
    expected: HashMap<K, Option<u64>>,
}

impl<K, V> TxnTable<K, V>
where
    K: Eq + Hash + Clone + core::fmt::Debug,
    V: Versioned,
{
    pub fn new(snapshot: HashMap<K, V>) -> Self {
        Self {
            snapshot,
            staged: HashMap::new(),
            expected: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.staged.get(key).or_else(|| self.snapshot.get(key))
    }

    /// Staged rows shadow snapshot rows.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.staged.values().chain(
            self.snapshot
                .iter()
                .filter(|(k, _)| !self.staged.contains_key(*k))
                .map(|(_, v)| v),
        )
    }

    pub fn insert(&mut self, key: K, row: V) -> DomainResult<()> {
        if self.get(&key).is_some() {
            return Err(DomainError::conflict(format!(
                "insert over existing row {key:?}"
            )));
        }
        self.expected.insert(key.clone(), None);
        self.staged.insert(key, row);
        Ok(())
    }

    pub fn update(&mut self, key: K, row: V) -> DomainResult<()> {
        if !self.expected.contains_key(&key) {
            let base = self
                .snapshot
                .get(&key)
                .map(|r| r.version())
                .ok_or_else(|| DomainError::conflict(format!("update of missing row {key:?}")))?;
            self.expected.insert(key.clone(), Some(base));
        }
        self.staged.insert(key, row);
        Ok(())
    }

    /// Check every staged write against the live table.
    pub fn verify(&self, live: &HashMap<K, V>) -> DomainResult<()> {
        for (key, expected) in &self.expected {
            match (expected, live.get(key)) {
                (None, None) => {}
                (None, Some(_)) => {
                    return Err(DomainError::conflict(format!(
                        "row {key:?} was inserted concurrently"
                    )));
                }
                (Some(version), Some(current)) => {
                    ExpectedVersion::Exact(*version).check(current.version())?;
                }
                (Some(_), None) => {
                    return Err(DomainError::conflict(format!(
                        "row {key:?} was deleted concurrently"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Apply staged writes, bumping each row's version. Call after `verify`.
    pub fn apply(self, live: &mut HashMap<K, V>) {
        for (key, mut row) in self.staged {
            let next = match self.expected.get(&key) {
                Some(Some(version)) => version + 1,
                _ => 1,
            };
            row.set_version(next);
            live.insert(key, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        value: i64,
        version: u64,
    }

    impl Versioned for Row {
        fn version(&self) -> u64 {
            self.version
        }

        fn set_version(&mut self, version: u64) {
            self.version = version;
        }
    }

    fn live_with(key: &str, value: i64, version: u64) -> HashMap<String, Row> {
        HashMap::from([(key.to_string(), Row { value, version })])
    }

    #[test]
    fn staged_rows_shadow_snapshot_reads() {
        let mut table = TxnTable::new(live_with("a", 1, 1));
        table
            .update("a".to_string(), Row { value: 2, version: 1 })
            .unwrap();
        assert_eq!(table.get(&"a".to_string()).unwrap().value, 2);
    }

    #[test]
    fn commit_bumps_versions() {
        let mut live = live_with("a", 1, 3);
        let mut table = TxnTable::new(live.clone());
        table
            .update("a".to_string(), Row { value: 9, version: 3 })
            .unwrap();
        table.verify(&live).unwrap();
        table.apply(&mut live);
        assert_eq!(live[&"a".to_string()], Row { value: 9, version: 4 });
    }

    #[test]
    fn concurrent_update_is_detected() {
        let live_at_commit = live_with("a", 5, 4);
        let mut table = TxnTable::new(live_with("a", 1, 3));
        table
            .update("a".to_string(), Row { value: 9, version: 3 })
            .unwrap();
        let err = table.verify(&live_at_commit).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn concurrent_insert_is_detected() {
        let mut table: TxnTable<String, Row> = TxnTable::new(HashMap::new());
        table
            .insert("a".to_string(), Row { value: 1, version: 0 })
            .unwrap();
        let err = table.verify(&live_with("a", 7, 1)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn inserted_rows_start_at_version_one() {
        let mut live = HashMap::new();
        let mut table: TxnTable<String, Row> = TxnTable::new(HashMap::new());
        table
            .insert("a".to_string(), Row { value: 1, version: 0 })
            .unwrap();
        table.verify(&live).unwrap();
        table.apply(&mut live);
        assert_eq!(live[&"a".to_string()].version, 1);
    }

    #[test]
    fn expected_version_pins_to_first_write() {
        let mut live = live_with("a", 1, 2);
        let mut table = TxnTable::new(live.clone());
        table
            .update("a".to_string(), Row { value: 2, version: 2 })
            .unwrap();
        table
            .update("a".to_string(), Row { value: 3, version: 2 })
            .unwrap();
        table.verify(&live).unwrap();
        table.apply(&mut live);
        assert_eq!(live[&"a".to_string()], Row { value: 3, version: 3 });
    }
}
