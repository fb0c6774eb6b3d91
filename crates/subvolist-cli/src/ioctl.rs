//! Btrfs kernel transport.
//!
//! Implements the core enumeration and lookup traits on top of the
//! `BTRFS_IOC_TREE_SEARCH` and `BTRFS_IOC_INO_LOOKUP` ioctls. The search is
//! driven over the tree of tree roots and scoped to ROOT_BACKREF items, so
//! every returned item describes one subvolume's name and parent.

use std::fs::File;
use std::io::{self, Cursor};
use std::os::unix::io::AsRawFd;

use byteorder::{LittleEndian, ReadBytesExt};
use subvolist_core::enumerate::ROOT_BACKREF_KEY;
use subvolist_core::{BackrefItem, InoPathLookup, SearchCursor, SubvolEnumerator};

/// Objectid of the tree of tree roots, where backrefs live.
const ROOT_TREE_OBJECTID: u64 = 1;

/// Items requested per search call. Just a big number; the kernel also
/// stops when its reply buffer fills.
const NR_ITEMS_PER_CALL: u32 = 4096;

const SEARCH_KEY_SIZE: usize = 104;
const SEARCH_BUF_SIZE: usize = 4096 - SEARCH_KEY_SIZE;
const SEARCH_HEADER_SIZE: usize = 32;
/// dirid (8) + sequence (8) + name_len (2), name bytes follow.
const ROOT_REF_FIXED_SIZE: usize = 18;
const INO_LOOKUP_PATH_MAX: usize = 4080;

// _IOWR('\x94', nr, 4096-byte argument)
const fn btrfs_iowr(nr: libc::c_ulong) -> libc::c_ulong {
    (3 << 30) | (4096 << 16) | (0x94 << 8) | nr
}

const BTRFS_IOC_TREE_SEARCH: libc::c_ulong = btrfs_iowr(17);
const BTRFS_IOC_INO_LOOKUP: libc::c_ulong = btrfs_iowr(18);

#[repr(C)]
struct SearchKey {
    tree_id: u64,
    min_objectid: u64,
    max_objectid: u64,
    min_offset: u64,
    max_offset: u64,
    min_transid: u64,
    max_transid: u64,
    min_type: u32,
    max_type: u32,
    nr_items: u32,
    unused: u32,
    unused1: u64,
    unused2: u64,
    unused3: u64,
    unused4: u64,
}

#[repr(C)]
struct SearchArgs {
    key: SearchKey,
    buf: [u8; SEARCH_BUF_SIZE],
}

impl SearchArgs {
    fn for_cursor(cursor: &SearchCursor) -> Self {
        SearchArgs {
            key: SearchKey {
                tree_id: ROOT_TREE_OBJECTID,
                min_objectid: cursor.min_subvol_id,
                max_objectid: u64::MAX,
                min_offset: cursor.min_parent_root_id,
                max_offset: u64::MAX,
                min_transid: 0,
                max_transid: u64::MAX,
                min_type: cursor.min_record_type,
                max_type: ROOT_BACKREF_KEY,
                nr_items: NR_ITEMS_PER_CALL,
                unused: 0,
                unused1: 0,
                unused2: 0,
                unused3: 0,
                unused4: 0,
            },
            buf: [0; SEARCH_BUF_SIZE],
        }
    }
}

#[repr(C)]
struct InoLookupArgs {
    treeid: u64,
    objectid: u64,
    name: [u8; INO_LOOKUP_PATH_MAX],
}

/// Paginated backref enumeration over an open btrfs file descriptor.
pub struct TreeSearchEnumerator<'a> {
    file: &'a File,
}

impl<'a> TreeSearchEnumerator<'a> {
    pub fn new(file: &'a File) -> Self {
        Self { file }
    }
}

impl SubvolEnumerator for TreeSearchEnumerator<'_> {
    fn search(&mut self, cursor: &SearchCursor) -> io::Result<Vec<BackrefItem>> {
        let mut args = SearchArgs::for_cursor(cursor);
        let ret = unsafe {
            libc::ioctl(self.file.as_raw_fd(), BTRFS_IOC_TREE_SEARCH as _, &mut args)
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        // The kernel rewrites nr_items to the number it actually returned.
        parse_backref_items(&args.buf, args.key.nr_items)
    }
}

/// Pull `nr_items` (search header, payload) pairs out of the reply buffer
/// and decode the ROOT_BACKREF payloads.
fn parse_backref_items(buf: &[u8], nr_items: u32) -> io::Result<Vec<BackrefItem>> {
    let mut items = Vec::with_capacity(nr_items as usize);
    let mut off = 0usize;

    for _ in 0..nr_items {
        if off + SEARCH_HEADER_SIZE > buf.len() {
            return Err(invalid("search header past end of reply buffer"));
        }
        let mut header = Cursor::new(&buf[off..off + SEARCH_HEADER_SIZE]);
        let _transid = header.read_u64::<LittleEndian>()?;
        let objectid = header.read_u64::<LittleEndian>()?;
        let offset = header.read_u64::<LittleEndian>()?;
        let item_type = header.read_u32::<LittleEndian>()?;
        let len = header.read_u32::<LittleEndian>()? as usize;
        off += SEARCH_HEADER_SIZE;

        if off + len > buf.len() {
            return Err(invalid("item payload past end of reply buffer"));
        }
        if item_type == ROOT_BACKREF_KEY {
            items.push(parse_root_ref(objectid, offset, &buf[off..off + len])?);
        }
        off += len;
    }

    Ok(items)
}

/// Decode one root_ref payload: the backref of subvolume `objectid` inside
/// root `offset`.
fn parse_root_ref(objectid: u64, offset: u64, payload: &[u8]) -> io::Result<BackrefItem> {
    if payload.len() < ROOT_REF_FIXED_SIZE {
        return Err(invalid("root_ref payload too short"));
    }
    let mut cursor = Cursor::new(payload);
    let dir_id = cursor.read_u64::<LittleEndian>()?;
    let _sequence = cursor.read_u64::<LittleEndian>()?;
    let name_len = cursor.read_u16::<LittleEndian>()? as usize;

    if payload.len() < ROOT_REF_FIXED_SIZE + name_len {
        return Err(invalid("root_ref name past end of payload"));
    }
    let name_bytes = &payload[ROOT_REF_FIXED_SIZE..ROOT_REF_FIXED_SIZE + name_len];

    Ok(BackrefItem {
        subvol_id: objectid,
        parent_root_id: offset,
        dir_id,
        name: String::from_utf8_lossy(name_bytes).into_owned(),
    })
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Directory path fragments via `BTRFS_IOC_INO_LOOKUP`.
///
/// The kernel returns the path of the directory inside the given root with
/// a trailing `/`, or an empty string when the directory is the root
/// itself.
pub struct InoLookup<'a> {
    file: &'a File,
}

impl<'a> InoLookup<'a> {
    pub fn new(file: &'a File) -> Self {
        Self { file }
    }
}

impl InoPathLookup for InoLookup<'_> {
    fn lookup(&mut self, root_id: u64, dir_id: u64) -> io::Result<String> {
        let mut args = InoLookupArgs {
            treeid: root_id,
            objectid: dir_id,
            name: [0; INO_LOOKUP_PATH_MAX],
        };
        let ret = unsafe {
            libc::ioctl(self.file.as_raw_fd(), BTRFS_IOC_INO_LOOKUP as _, &mut args)
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        let end = args
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(args.name.len());
        Ok(String::from_utf8_lossy(&args.name[..end]).into_owned())
    }
}
