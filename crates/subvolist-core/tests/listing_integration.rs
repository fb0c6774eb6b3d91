//! End-to-end listing over an in-memory backref source.

use std::io;

use subvolist_core::{
    list_subvols, BackrefItem, InoPathLookup, SearchCursor, SubvolEntry, SubvolEnumerator,
};

/// Enumerator over a fixed record set, honoring the cursor and a batch cap
/// the way the kernel search would.
struct FixtureEnumerator {
    items: Vec<BackrefItem>,
    batch_cap: usize,
}

impl FixtureEnumerator {
    fn new(mut items: Vec<BackrefItem>, batch_cap: usize) -> Self {
        items.sort_by_key(|i| (i.subvol_id, i.parent_root_id));
        Self { items, batch_cap }
    }
}

impl SubvolEnumerator for FixtureEnumerator {
    fn search(&mut self, cursor: &SearchCursor) -> io::Result<Vec<BackrefItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| {
                (i.subvol_id, i.parent_root_id) >= (cursor.min_subvol_id, cursor.min_parent_root_id)
            })
            .take(self.batch_cap)
            .cloned()
            .collect())
    }
}

/// Every directory is the root of its tree: lookups return empty fragments.
struct RootOnlyLookup;

impl InoPathLookup for RootOnlyLookup {
    fn lookup(&mut self, _root_id: u64, _dir_id: u64) -> io::Result<String> {
        Ok(String::new())
    }
}

/// Fragments keyed by (root, dir), for subvolumes living in subdirectories.
struct TableLookup(Vec<((u64, u64), &'static str)>);

impl InoPathLookup for TableLookup {
    fn lookup(&mut self, root_id: u64, dir_id: u64) -> io::Result<String> {
        self.0
            .iter()
            .find(|((r, d), _)| *r == root_id && *d == dir_id)
            .map(|(_, frag)| frag.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown directory"))
    }
}

fn backref(subvol_id: u64, parent_root_id: u64, dir_id: u64, name: &str) -> BackrefItem {
    BackrefItem {
        subvol_id,
        parent_root_id,
        dir_id,
        name: name.to_string(),
    }
}

#[test]
fn nested_snapshots_list_with_full_paths() {
    // toplevel (5, self-referential)
    //   └── snap1 (256)
    //         └── nested (257)
    let records = vec![
        backref(5, 5, 0, "toplevel"),
        backref(256, 5, 256, "snap1"),
        backref(257, 256, 256, "nested"),
    ];

    let mut enumerator = FixtureEnumerator::new(records, 4096);
    let entries = list_subvols(&mut enumerator, &mut RootOnlyLookup).unwrap();

    assert_eq!(
        entries,
        vec![
            SubvolEntry {
                subvol_id: 257,
                top_level_id: 5,
                path: "toplevel/snap1/nested".to_string(),
            },
            SubvolEntry {
                subvol_id: 256,
                top_level_id: 5,
                path: "toplevel/snap1".to_string(),
            },
            SubvolEntry {
                subvol_id: 5,
                top_level_id: 5,
                path: "toplevel".to_string(),
            },
        ]
    );
}

#[test]
fn pagination_does_not_change_the_listing() {
    let records = vec![
        backref(5, 5, 0, "toplevel"),
        backref(256, 5, 256, "snap1"),
        backref(257, 256, 256, "nested"),
        backref(258, 5, 256, "snap2"),
        backref(259, 258, 256, "deep"),
    ];

    let mut one_shot = FixtureEnumerator::new(records.clone(), 4096);
    let combined = list_subvols(&mut one_shot, &mut RootOnlyLookup).unwrap();

    let mut paginated = FixtureEnumerator::new(records, 2);
    let paged = list_subvols(&mut paginated, &mut RootOnlyLookup).unwrap();

    assert_eq!(combined, paged);
}

#[test]
fn subdirectory_fragments_appear_in_paths() {
    let records = vec![
        backref(5, 5, 0, "toplevel"),
        backref(256, 5, 789, "daily-1"),
    ];
    let mut enumerator = FixtureEnumerator::new(records, 4096);
    let mut lookup = TableLookup(vec![((5, 0), ""), ((5, 789), "snapshots/")]);

    let entries = list_subvols(&mut enumerator, &mut lookup).unwrap();
    let daily = entries.iter().find(|e| e.subvol_id == 256).unwrap();
    assert_eq!(daily.path, "toplevel/snapshots/daily-1");
    assert_eq!(daily.top_level_id, 5);
}

#[test]
fn listing_aborts_on_first_lookup_failure() {
    let records = vec![backref(5, 5, 0, "toplevel"), backref(256, 5, 999, "snap")];
    let mut enumerator = FixtureEnumerator::new(records, 4096);
    // Only the top level's directory is known.
    let mut lookup = TableLookup(vec![((5, 0), "")]);

    let err = list_subvols(&mut enumerator, &mut lookup).unwrap_err();
    assert!(matches!(
        err,
        subvolist_core::ListError::Lookup {
            root_id: 5,
            dir_id: 999,
            ..
        }
    ));
}

#[test]
fn parent_outside_the_listing_becomes_top_level() {
    // 256 claims parent 42, which is never enumerated.
    let records = vec![backref(256, 42, 0, "stray")];
    let mut enumerator = FixtureEnumerator::new(records, 4096);

    let entries = list_subvols(&mut enumerator, &mut RootOnlyLookup).unwrap();
    assert_eq!(
        entries,
        vec![SubvolEntry {
            subvol_id: 256,
            top_level_id: 42,
            path: "stray".to_string(),
        }]
    );
}
