use thiserror::Error;

/// Errors surfaced by the subvolume listing engine.
///
/// The listing is all-or-nothing: every variant aborts the whole operation
/// at the point it is first encountered, and no partial results are reported.
#[derive(Debug, Error)]
pub enum ListError {
    /// The backref enumeration call itself failed.
    #[error("subvolume enumeration failed: {0}")]
    Enumeration(#[source] std::io::Error),

    /// A second backref with the same (subvol, referencing root) pair was
    /// delivered during the build phase.
    #[error("duplicate backref for subvolume {subvol_id} referenced by root {parent_root_id}")]
    DuplicateKey { subvol_id: u64, parent_root_id: u64 },

    /// The per-record directory path lookup failed.
    #[error("path lookup failed for root {root_id} dir {dir_id}: {source}")]
    Lookup {
        root_id: u64,
        dir_id: u64,
        #[source]
        source: std::io::Error,
    },

    /// Stitching reached a record whose local path was never resolved.
    /// This is an internal invariant failure, not an input condition.
    #[error("subvolume {0} reached the stitch phase without a resolved local path")]
    UnresolvedAncestor(u64),
}
