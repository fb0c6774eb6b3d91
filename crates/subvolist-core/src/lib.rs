//! Subvolume listing engine.
//!
//! Builds an ordered index of subvolume backreferences from a paginated
//! enumeration source, resolves each record's path relative to its
//! referencing root, then stitches parent chains together to produce every
//! subvolume's full path from the filesystem's top level.
//!
//! The enumeration transport and the per-record path lookup are supplied by
//! the caller through the [`SubvolEnumerator`] and [`InoPathLookup`] traits;
//! this crate never touches a device itself.

use serde::Serialize;

pub mod enumerate;
pub mod error;
pub mod index;
pub mod resolve;
pub mod stitch;

pub use enumerate::{build_index, BackrefItem, SearchCursor, SubvolEnumerator};
pub use error::ListError;
pub use index::{RootIndex, RootRecord};
pub use resolve::{resolve_local_path, InoPathLookup};
pub use stitch::stitch_path;

/// One listed subvolume: its id, the id its ancestor chain terminates at,
/// and its full path relative to that top level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubvolEntry {
    pub subvol_id: u64,
    pub top_level_id: u64,
    pub path: String,
}

/// List every subvolume reachable through `enumerator`.
///
/// Runs the three phases back to back: build the index from paginated
/// backref batches, resolve each record's local path in ascending key
/// order, then stitch full paths in descending order. Entries come back in
/// descending `subvol_id` order. All-or-nothing: the first error aborts
/// the listing with no partial results.
pub fn list_subvols<E, L>(enumerator: &mut E, lookup: &mut L) -> Result<Vec<SubvolEntry>, ListError>
where
    E: SubvolEnumerator,
    L: InoPathLookup,
{
    let mut index = build_index(enumerator)?;
    tracing::info!("indexed {} subvolume references", index.len());

    for record in index.iter_ascending_mut() {
        resolve::resolve_local_path(record, lookup)?;
    }
    tracing::debug!("local paths resolved");

    let mut entries = Vec::with_capacity(index.len());
    for record in index.iter_descending() {
        let (top_level_id, path) = stitch_path(&index, record)?;
        entries.push(SubvolEntry {
            subvol_id: record.subvol_id,
            top_level_id,
            path,
        });
    }

    tracing::info!("listed {} subvolumes", entries.len());
    Ok(entries)
}
