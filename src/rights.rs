//! Rights & Flag Algebra (C2, §4.2). Per-filetype capability presets, and the
//! narrowing rule `path_open` applies when deriving a child's rights from its
//! parent. Grounded directly on the teacher's `RightsExt` in `handle.rs`.

use crate::types::Rights;

/// Rights held by (or requested of) a descriptor: a base set usable directly
/// on the descriptor, and an inheriting set passed down to children opened
/// through it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandleRights {
    base: Rights,
    inheriting: Rights,
}

impl HandleRights {
    pub fn new(base: Rights, inheriting: Rights) -> Self {
        Self { base, inheriting }
    }

    pub fn from_base(base: Rights) -> Self {
        Self {
            base,
            inheriting: Rights::empty(),
        }
    }

    pub fn empty() -> Self {
        Self {
            base: Rights::empty(),
            inheriting: Rights::empty(),
        }
    }

    pub fn base(&self) -> Rights {
        self.base
    }

    pub fn inheriting(&self) -> Rights {
        self.inheriting
    }

    /// True if `self` grants everything `other` requires.
    pub fn contains(&self, other: HandleRights) -> bool {
        self.base.contains(other.base) && self.inheriting.contains(other.inheriting)
    }

    /// Derive a child's rights from this (the parent's) `inheriting` set and
    /// the caller-requested rights, per §4.2: "intersects the parent's
    /// rights_inheriting with the caller-supplied fs_rights_base". Rights
    /// are monotonically non-increasing (§3 invariants) — a child can only
    /// narrow, never widen, what its opener holds.
    pub fn narrow_for_child(&self, requested_base: Rights, requested_inheriting: Rights) -> Self {
        Self {
            base: self.inheriting.intersection(requested_base),
            inheriting: self.inheriting.intersection(requested_inheriting),
        }
    }
}

pub trait RightsExt: Sized {
    fn block_device_base() -> Self;
    fn block_device_inheriting() -> Self;
    fn character_device_base() -> Self;
    fn character_device_inheriting() -> Self;
    fn directory_base() -> Self;
    fn directory_inheriting() -> Self;
    fn regular_file_base() -> Self;
    fn regular_file_inheriting() -> Self;
    fn socket_base() -> Self;
    fn socket_inheriting() -> Self;
    fn tty_base() -> Self;
    fn tty_inheriting() -> Self;
}

impl RightsExt for Rights {
    fn block_device_base() -> Self {
        Self::all()
    }
    fn block_device_inheriting() -> Self {
        Self::all()
    }
    fn character_device_base() -> Self {
        Self::all()
    }
    fn character_device_inheriting() -> Self {
        Self::all()
    }

    fn directory_base() -> Self {
        Self::FD_FDSTAT_SET_FLAGS
            | Self::FD_SYNC
            | Self::FD_ADVISE
            | Self::PATH_CREATE_DIRECTORY
            | Self::PATH_CREATE_FILE
            | Self::PATH_LINK_SOURCE
            | Self::PATH_LINK_TARGET
            | Self::PATH_OPEN
            | Self::FD_READDIR
            | Self::PATH_READLINK
            | Self::PATH_RENAME_SOURCE
            | Self::PATH_RENAME_TARGET
            | Self::PATH_FILESTAT_GET
            | Self::PATH_FILESTAT_SET_SIZE
            | Self::PATH_FILESTAT_SET_TIMES
            | Self::FD_FILESTAT_GET
            | Self::FD_FILESTAT_SET_TIMES
            | Self::PATH_SYMLINK
            | Self::PATH_UNLINK_FILE
            | Self::PATH_REMOVE_DIRECTORY
            | Self::POLL_FD_READWRITE
    }
    fn directory_inheriting() -> Self {
        Self::all() ^ Self::SOCK_SHUTDOWN
    }

    fn regular_file_base() -> Self {
        Self::FD_DATASYNC
            | Self::FD_READ
            | Self::FD_SEEK
            | Self::FD_FDSTAT_SET_FLAGS
            | Self::FD_SYNC
            | Self::FD_TELL
            | Self::FD_WRITE
            | Self::FD_ADVISE
            | Self::FD_ALLOCATE
            | Self::FD_FILESTAT_GET
            | Self::FD_FILESTAT_SET_SIZE
            | Self::FD_FILESTAT_SET_TIMES
            | Self::POLL_FD_READWRITE
    }
    fn regular_file_inheriting() -> Self {
        Self::empty()
    }

    fn socket_base() -> Self {
        Self::FD_READ
            | Self::FD_FDSTAT_SET_FLAGS
            | Self::FD_WRITE
            | Self::FD_FILESTAT_GET
            | Self::POLL_FD_READWRITE
            | Self::SOCK_SHUTDOWN
    }
    fn socket_inheriting() -> Self {
        Self::all()
    }

    fn tty_base() -> Self {
        Self::FD_READ
            | Self::FD_FDSTAT_SET_FLAGS
            | Self::FD_WRITE
            | Self::FD_FILESTAT_GET
            | Self::POLL_FD_READWRITE
    }
    fn tty_inheriting() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_cannot_exceed_parent_inheriting() {
        let parent = HandleRights::new(Rights::directory_base(), Rights::regular_file_base());
        let child = parent.narrow_for_child(Rights::all(), Rights::all());
        assert_eq!(child.base(), Rights::regular_file_base());
        assert!(parent.inheriting().contains(child.base()));
    }

    #[test]
    fn contains_is_reflexive() {
        let r = HandleRights::new(Rights::FD_READ | Rights::FD_WRITE, Rights::empty());
        assert!(r.contains(r));
    }
}
