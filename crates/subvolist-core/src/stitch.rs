//! Stitch phase: walk parent-reference chains through the index to build
//! each subvolume's path back to the top level.

use crate::error::ListError;
use crate::index::{RootIndex, RootRecord};

/// Follow `record`'s ancestor chain and assemble its full path.
///
/// Returns the id of the root the chain terminates at and the path of the
/// subvolume relative to that root. The chain ends either at a
/// self-referential record or at a parent id absent from the index; in the
/// latter case the parent is the visible top of the hierarchy from this
/// listing's perspective.
///
/// Precondition: every record on the chain has been through the resolve
/// phase. The walk is iterative, so deep nesting cannot overflow the stack;
/// input is assumed acyclic (a forest of references).
pub fn stitch_path(index: &RootIndex, record: &RootRecord) -> Result<(u64, String), ListError> {
    let mut current = record;
    let mut full_path = local_path(current)?.to_string();

    loop {
        let next_parent = current.parent_root_id;
        if next_parent == current.subvol_id {
            return Ok((next_parent, full_path));
        }

        match index.find_first(next_parent) {
            Some(found) => {
                full_path = format!("{}/{}", local_path(found)?, full_path);
                current = found;
            }
            None => return Ok((next_parent, full_path)),
        }
    }
}

fn local_path(record: &RootRecord) -> Result<&str, ListError> {
    record
        .local_path
        .as_deref()
        .ok_or(ListError::UnresolvedAncestor(record.subvol_id))
}
