//! Build phase: drive a paginated backref enumeration into a [`RootIndex`].

use std::io;

use crate::error::ListError;
use crate::index::RootIndex;

/// Key type of subvolume backreference records in the tree of tree roots.
pub const ROOT_BACKREF_KEY: u32 = 144;

/// One subvolume backreference as delivered by the enumeration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackrefItem {
    pub subvol_id: u64,
    pub parent_root_id: u64,
    pub dir_id: u64,
    pub name: String,
}

/// Search position for the paginated enumeration.
///
/// Mirrors the index key ordering: `subvol_id` first, ties broken by record
/// type and then `parent_root_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchCursor {
    pub min_subvol_id: u64,
    pub min_record_type: u32,
    pub min_parent_root_id: u64,
}

impl SearchCursor {
    /// Cursor covering the whole backref keyspace from the start.
    pub fn start() -> Self {
        Self {
            min_subvol_id: 0,
            min_record_type: ROOT_BACKREF_KEY,
            min_parent_root_id: 0,
        }
    }

    /// Advance just past `last`, the final item of a batch, so the next
    /// search cannot repeat it. Returns `false` when the bump would
    /// overflow, at which point enumeration is complete by definition:
    /// no identifier can exceed `u64::MAX`.
    pub fn advance_past(&mut self, last: &BackrefItem) -> bool {
        self.min_record_type = ROOT_BACKREF_KEY;
        self.min_parent_root_id = last.parent_root_id;
        if last.subvol_id == u64::MAX {
            return false;
        }
        self.min_subvol_id = last.subvol_id + 1;
        true
    }
}

/// Paginated source of subvolume backreference records.
///
/// Each call returns one bounded batch of items at or after `cursor`; an
/// empty batch signals that enumeration is complete. The caller owns cursor
/// advancement.
pub trait SubvolEnumerator {
    fn search(&mut self, cursor: &SearchCursor) -> io::Result<Vec<BackrefItem>>;
}

/// Collect every backref the enumerator yields into a fresh index.
///
/// Enumerator failure and duplicate composite keys are both fatal; the
/// partially built index is discarded with the error.
pub fn build_index<E: SubvolEnumerator>(enumerator: &mut E) -> Result<RootIndex, ListError> {
    let mut index = RootIndex::new();
    let mut cursor = SearchCursor::start();

    loop {
        let batch = enumerator.search(&cursor).map_err(ListError::Enumeration)?;
        let Some(last) = batch.last().cloned() else {
            break;
        };
        tracing::debug!("backref batch: {} items", batch.len());

        for item in batch {
            index.insert(item.subvol_id, item.parent_root_id, item.dir_id, item.name)?;
        }

        if !cursor.advance_past(&last) {
            break;
        }
    }

    tracing::debug!("index built: {} subvolume references", index.len());
    Ok(index)
}
