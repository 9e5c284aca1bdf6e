//! File-Descriptor Table (C5, §4.5, §3 Data Model). Owns every open
//! [`DescriptorEntry`] by fd number, allocates the smallest free fd at or
//! above 3, and enforces the single-owner lifetime of a [`crate::handle::Handle`].
//! Grounded on the teacher's `EntryTable` in `ctx.rs` (`fd_pool` + `HashMap`
//! split) and `old/snapshot_0/entry.rs` (rights validated on every access).

use crate::errno::{Error, Result};
use crate::handle::Handle;
use crate::rights::HandleRights;
use crate::types::{Fd, Fdflags, Filetype};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

/// One open descriptor (§3): the handle it owns, its current rights, and
/// its fd flags. The file cursor itself lives on the `Handle` impl (each
/// driver owns its own `Cell<Filesize>`), not here, since `fd_renumber`
/// and `fd_close` only ever move or drop the handle as a unit.
#[derive(Debug)]
pub struct DescriptorEntry {
    pub handle: Box<dyn Handle>,
    pub filetype: Filetype,
    pub rights: HandleRights,
    pub fdflags: Cell<Fdflags>,
    /// Set only for fds in `[3, 3+N)` representing a preopened mount root.
    pub preopen: Option<String>,
}

impl DescriptorEntry {
    pub fn new(handle: Box<dyn Handle>, rights: HandleRights, fdflags: Fdflags) -> Self {
        let filetype = handle.file_type();
        Self {
            handle,
            filetype,
            rights,
            fdflags: Cell::new(fdflags),
            preopen: None,
        }
    }

    pub fn with_preopen(mut self, prefix: String) -> Self {
        self.preopen = Some(prefix);
        self
    }

    /// Fail with `notcapable` unless `required` is a subset of what this
    /// descriptor holds (§4.2).
    pub fn require(&self, required: HandleRights) -> Result<()> {
        if self.rights.contains(required) {
            Ok(())
        } else {
            Err(Error::NotCapable("fd lacks required rights"))
        }
    }
}

#[derive(Debug, Default)]
pub struct FdTable {
    entries: HashMap<Fd, DescriptorEntry>,
    /// fds below this watermark have all been allocated at least once;
    /// above it nothing has ever been handed out. Used only to keep
    /// `allocate` cheap in the common case of no interleaved closes.
    next_fd: Fd,
    free_list: HashSet<Fd>,
}

const FIRST_FD: Fd = 3;

impl FdTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_fd: FIRST_FD,
            free_list: HashSet::new(),
        }
    }

    /// Inserts `entry` under the smallest free fd `>= 3`.
    pub fn insert(&mut self, entry: DescriptorEntry) -> Result<Fd> {
        let fd = self.smallest_free_fd().ok_or(Error::TooManyFiles)?;
        self.insert_at(fd, entry);
        Ok(fd)
    }

    /// Inserts stdio (0/1/2) or any other explicitly numbered fd, displacing
    /// whatever was there.
    pub fn insert_at(&mut self, fd: Fd, entry: DescriptorEntry) {
        self.free_list.remove(&fd);
        if fd >= self.next_fd {
            self.next_fd = fd + 1;
        }
        self.entries.insert(fd, entry);
    }

    fn smallest_free_fd(&mut self) -> Option<Fd> {
        if let Some(&fd) = self.free_list.iter().min() {
            self.free_list.remove(&fd);
            return Some(fd);
        }
        let fd = self.next_fd;
        self.next_fd = self.next_fd.checked_add(1)?;
        Some(fd)
    }

    pub fn get(&self, fd: Fd) -> Result<&DescriptorEntry> {
        self.entries.get(&fd).ok_or(Error::BadFileDescriptor)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut DescriptorEntry> {
        self.entries.get_mut(&fd).ok_or(Error::BadFileDescriptor)
    }

    pub fn contains(&self, fd: Fd) -> bool {
        self.entries.contains_key(&fd)
    }

    /// Drops the handle and returns the slot to the free list. Closing
    /// 0/1/2 is permitted (detaches the stdio sink, §4.5).
    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.entries.remove(&fd).ok_or(Error::BadFileDescriptor)?;
        if fd < self.next_fd {
            self.free_list.insert(fd);
        }
        Ok(())
    }

    /// Closes `to` if open, then moves `from`'s entry into `to`, per
    /// `fd_renumber` (§4.5): ownership transfers, `from` is left empty.
    pub fn renumber(&mut self, from: Fd, to: Fd) -> Result<()> {
        if !self.entries.contains_key(&from) {
            return Err(Error::BadFileDescriptor);
        }
        if self.entries.contains_key(&to) {
            self.entries.remove(&to);
        } else {
            self.free_list.remove(&to);
            if to >= self.next_fd {
                self.next_fd = to + 1;
            }
        }
        let entry = self.entries.remove(&from).unwrap();
        self.entries.insert(to, entry);
        self.free_list.insert(from);
        Ok(())
    }

    pub fn iter_preopens(&self) -> impl Iterator<Item = (Fd, &str)> {
        self.entries
            .iter()
            .filter_map(|(fd, e)| e.preopen.as_deref().map(|p| (*fd, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memfs::MemDir;
    use crate::rights::RightsExt;
    use crate::types::Rights;

    fn dummy_entry() -> DescriptorEntry {
        let dir = MemDir::new(true);
        DescriptorEntry::new(
            Box::new(dir),
            HandleRights::new(Rights::directory_base(), Rights::directory_inheriting()),
            Fdflags::empty(),
        )
    }

    #[test]
    fn allocates_from_three() {
        let mut table = FdTable::new();
        assert_eq!(table.insert(dummy_entry()).unwrap(), 3);
        assert_eq!(table.insert(dummy_entry()).unwrap(), 4);
    }

    #[test]
    fn reuses_smallest_freed_fd() {
        let mut table = FdTable::new();
        let a = table.insert(dummy_entry()).unwrap();
        let _b = table.insert(dummy_entry()).unwrap();
        let _c = table.insert(dummy_entry()).unwrap();
        table.close(a).unwrap();
        assert_eq!(table.insert(dummy_entry()).unwrap(), a);
    }

    #[test]
    fn close_is_not_reentrant() {
        let mut table = FdTable::new();
        let fd = table.insert(dummy_entry()).unwrap();
        table.close(fd).unwrap();
        assert!(matches!(table.close(fd), Err(Error::BadFileDescriptor)));
    }

    #[test]
    fn renumber_transfers_ownership_and_frees_source() {
        let mut table = FdTable::new();
        let a = table.insert(dummy_entry()).unwrap();
        let b = table.insert(dummy_entry()).unwrap();
        table.renumber(a, b).unwrap();
        assert!(table.get(a).is_err());
        assert!(table.get(b).is_ok());
    }
}
