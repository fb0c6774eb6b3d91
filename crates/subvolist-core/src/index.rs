//! Ordered index of subvolume backreferences.
//!
//! One record per distinct (subvolume, referencing root) pair. The composite
//! key keeps multiple references to the same subvolume apart while letting
//! `find_first` pick a deterministic entry for ancestor walks.

use std::collections::BTreeMap;

use crate::error::ListError;

/// One subvolume backreference discovered during the build phase.
#[derive(Debug, Clone)]
pub struct RootRecord {
    /// Id of the subvolume this record describes.
    pub subvol_id: u64,
    /// Id of the root that references `subvol_id`. Equal to `subvol_id`
    /// for a self-referential top-level root.
    pub parent_root_id: u64,
    /// Directory inside `parent_root_id` holding the reference.
    pub parent_dir_id: u64,
    /// Name of the subvolume within that directory. Not unique across
    /// records.
    pub name: String,
    /// Path of this subvolume relative to `parent_root_id`, filled in by
    /// the resolve phase. `None` until resolved.
    pub local_path: Option<String>,
}

/// Ordered container over [`RootRecord`], keyed by
/// `(subvol_id, parent_root_id)` ascending.
#[derive(Debug, Default)]
pub struct RootIndex {
    records: BTreeMap<(u64, u64), RootRecord>,
}

impl RootIndex {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
        }
    }

    /// Insert a new backreference.
    ///
    /// Keys are unique: a second insert with the same composite key is
    /// rejected and the existing entry kept untouched.
    pub fn insert(
        &mut self,
        subvol_id: u64,
        parent_root_id: u64,
        parent_dir_id: u64,
        name: String,
    ) -> Result<(), ListError> {
        let key = (subvol_id, parent_root_id);
        if self.records.contains_key(&key) {
            return Err(ListError::DuplicateKey {
                subvol_id,
                parent_root_id,
            });
        }
        self.records.insert(
            key,
            RootRecord {
                subvol_id,
                parent_root_id,
                parent_dir_id,
                name,
                local_path: None,
            },
        );
        Ok(())
    }

    /// Find the record for `subvol_id` with the smallest `parent_root_id`.
    ///
    /// When a subvolume is referenced from more than one parent, only this
    /// lowest-keyed entry is ever used for ancestor-chain walks.
    pub fn find_first(&self, subvol_id: u64) -> Option<&RootRecord> {
        self.records
            .range((subvol_id, 0)..=(subvol_id, u64::MAX))
            .map(|(_, record)| record)
            .next()
    }

    /// Records in ascending composite-key order.
    pub fn iter_ascending(&self) -> impl Iterator<Item = &RootRecord> {
        self.records.values()
    }

    /// Records in descending composite-key order.
    pub fn iter_descending(&self) -> impl Iterator<Item = &RootRecord> {
        self.records.values().rev()
    }

    /// Mutable ascending traversal, used by the resolve phase.
    pub(crate) fn iter_ascending_mut(&mut self) -> impl Iterator<Item = &mut RootRecord> {
        self.records.values_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(index: &mut RootIndex, subvol: u64, parent: u64, name: &str) {
        index
            .insert(subvol, parent, 256, name.to_string())
            .expect("insert failed");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut index = RootIndex::new();
        insert(&mut index, 256, 5, "first");

        let err = index.insert(256, 5, 999, "second".to_string()).unwrap_err();
        match err {
            ListError::DuplicateKey {
                subvol_id,
                parent_root_id,
            } => {
                assert_eq!(subvol_id, 256);
                assert_eq!(parent_root_id, 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        // The original entry survives the collision.
        assert_eq!(index.len(), 1);
        let kept = index.find_first(256).unwrap();
        assert_eq!(kept.name, "first");
        assert_eq!(kept.parent_dir_id, 256);
    }

    #[test]
    fn test_same_subvol_different_parents_coexist() {
        let mut index = RootIndex::new();
        insert(&mut index, 300, 7, "via-seven");
        insert(&mut index, 300, 5, "via-five");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_find_first_picks_smallest_parent() {
        let mut index = RootIndex::new();
        insert(&mut index, 300, 9, "high");
        insert(&mut index, 300, 2, "low");
        insert(&mut index, 300, 5, "mid");

        let found = index.find_first(300).unwrap();
        assert_eq!(found.parent_root_id, 2);
        assert_eq!(found.name, "low");
    }

    #[test]
    fn test_find_first_missing() {
        let mut index = RootIndex::new();
        insert(&mut index, 256, 5, "snap");
        assert!(index.find_first(257).is_none());
    }

    #[test]
    fn test_traversal_orders() {
        let mut index = RootIndex::new();
        insert(&mut index, 257, 256, "nested");
        insert(&mut index, 5, 5, "toplevel");
        insert(&mut index, 256, 5, "snap");

        let ascending: Vec<(u64, u64)> = index
            .iter_ascending()
            .map(|r| (r.subvol_id, r.parent_root_id))
            .collect();
        assert_eq!(ascending, vec![(5, 5), (256, 5), (257, 256)]);

        let descending: Vec<u64> = index.iter_descending().map(|r| r.subvol_id).collect();
        assert_eq!(descending, vec![257, 256, 5]);
    }
}
