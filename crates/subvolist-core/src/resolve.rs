//! Resolve phase: fill in each record's path relative to its referencing
//! root.

use std::io;

use crate::error::ListError;
use crate::index::RootRecord;

/// Translates a (root, directory) pair into a directory path fragment.
///
/// An empty fragment means the directory is the root of `root_id`; a
/// non-empty fragment already carries a trailing `/`, so the record name
/// can be appended directly.
pub trait InoPathLookup {
    fn lookup(&mut self, root_id: u64, dir_id: u64) -> io::Result<String>;
}

/// Set `record.local_path` from the parent-directory fragment and the
/// record's own name. Idempotent: an already-resolved record is left alone.
pub fn resolve_local_path<L: InoPathLookup>(
    record: &mut RootRecord,
    lookup: &mut L,
) -> Result<(), ListError> {
    if record.local_path.is_some() {
        return Ok(());
    }

    let fragment = lookup
        .lookup(record.parent_root_id, record.parent_dir_id)
        .map_err(|source| ListError::Lookup {
            root_id: record.parent_root_id,
            dir_id: record.parent_dir_id,
            source,
        })?;

    record.local_path = Some(if fragment.is_empty() {
        record.name.clone()
    } else {
        format!("{}{}", fragment, record.name)
    });
    Ok(())
}
