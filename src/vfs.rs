//! VFS Router (C4, §4.4). Normalizes a guest path, enforces that `..` never
//! escapes the anchor's mount, and walks the path one component at a time
//! through [`crate::handle::Handle::openat`] calls on the anchor. Each
//! driver only ever sees single path components relative to whatever
//! directory it is currently handling — cross-device remapping or a
//! separate mount-table lookup mid-walk is never needed, since an anchor fd
//! is already pinned to one device's subtree (§9 design note).
//!
//! `.`/`..` are resolved here, never forwarded to a driver's `openat`, so
//! the boundary check in step 2 below is the single place "escape the
//! mount" is enforced regardless of which driver backs the anchor.

use crate::errno::{Error, Result};
use crate::handle::Handle;
use crate::types::{Fdflags, Oflags};

/// Splits and normalizes a guest path into forward-only components,
/// collapsing `.` and resolving `..` against the stack built so far. A `..`
/// with nothing left to pop means the path tries to climb above the
/// anchor — rejected with `notcapable` (§4.4 rule 2).
pub fn normalize_components(path: &str) -> Result<Vec<&str>> {
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if stack.pop().is_none() {
                    return Err(Error::NotCapable("path escapes the anchor's mount"));
                }
            }
            other => stack.push(other),
        }
    }
    Ok(stack)
}

/// A directory handle plus the single final path component within it —
/// what `path_unlink_file`, `path_remove_directory`, `path_create_directory`,
/// `path_rename`, and `path_filestat_get` all need.
pub struct ResolvedParent {
    pub parent: Box<dyn Handle>,
    pub last: String,
}

/// Walks every component but the last, returning the directory that
/// contains the named target and the target's own (single-segment) name.
/// Fails `notdir` the moment an intermediate component is not a directory.
pub fn resolve_parent(anchor: &dyn Handle, path: &str) -> Result<ResolvedParent> {
    let components = normalize_components(path)?;
    let (last, dirs) = components
        .split_last()
        .ok_or(Error::InvalidArgument("empty path"))?;

    let mut current: Box<dyn Handle> = anchor.try_clone()?;
    for comp in dirs {
        if !current.is_directory() {
            return Err(Error::NotADirectory);
        }
        current = current.openat(comp, Oflags::DIRECTORY, Fdflags::empty())?;
    }
    if !current.is_directory() {
        return Err(Error::NotADirectory);
    }

    Ok(ResolvedParent {
        parent: current,
        last: (*last).to_owned(),
    })
}

/// Fully resolves `path` relative to `anchor`, opening the final component
/// with `oflags`/`fd_flags` (`path_open`, §4.6). An empty normalized path
/// (e.g. `"."` or `""`) refers to the anchor itself.
pub fn resolve(
    anchor: &dyn Handle,
    path: &str,
    oflags: Oflags,
    fd_flags: Fdflags,
) -> Result<Box<dyn Handle>> {
    let components = normalize_components(path)?;
    if components.is_empty() {
        return Ok(anchor.try_clone()?);
    }

    let (last, dirs) = components.split_last().unwrap();
    let mut current: Box<dyn Handle> = anchor.try_clone()?;
    for comp in dirs {
        if !current.is_directory() {
            return Err(Error::NotADirectory);
        }
        current = current.openat(comp, Oflags::DIRECTORY, Fdflags::empty())?;
    }
    if !current.is_directory() {
        return Err(Error::NotADirectory);
    }
    current.openat(last, oflags, fd_flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memfs::MemDir;

    #[test]
    fn dotdot_above_root_is_rejected() {
        let err = normalize_components("../escape");
        assert!(matches!(err, Err(Error::NotCapable(_))));
    }

    #[test]
    fn dot_segments_collapse_away() {
        let components = normalize_components("./a/./b").unwrap();
        assert_eq!(components, vec!["a", "b"]);
    }

    #[test]
    fn dotdot_cancels_preceding_component() {
        let components = normalize_components("a/../b").unwrap();
        assert_eq!(components, vec!["b"]);
    }

    #[test]
    fn resolve_nested_path_through_directories() {
        let root = MemDir::new(true);
        root.create_directory("sub").unwrap();
        let sub = root
            .openat("sub", Oflags::DIRECTORY, Fdflags::empty())
            .unwrap();
        sub.downcast_ref::<MemDir>()
            .unwrap()
            .add_file("leaf.txt", b"data".to_vec());

        let handle = resolve(&root, "sub/leaf.txt", Oflags::empty(), Fdflags::empty()).unwrap();
        assert_eq!(handle.filestat().unwrap().size, 4);
    }

    #[test]
    fn resolve_parent_splits_directory_and_name() {
        let root = MemDir::new(true);
        root.create_directory("sub").unwrap();
        let resolved = resolve_parent(&root, "sub/leaf.txt").unwrap();
        assert_eq!(resolved.last, "leaf.txt");
        assert!(resolved.parent.is_directory());
    }

    #[test]
    fn resolve_dot_returns_anchor_itself() {
        let root = MemDir::new(true);
        let handle = resolve(&root, ".", Oflags::empty(), Fdflags::empty()).unwrap();
        assert!(handle.is_directory());
    }

    #[test]
    fn intermediate_file_component_is_not_a_directory() {
        let root = MemDir::new(true);
        root.openat("file.txt", Oflags::CREAT, Fdflags::empty())
            .unwrap();
        let err = resolve(&root, "file.txt/leaf.txt", Oflags::empty(), Fdflags::empty());
        assert!(matches!(err, Err(Error::NotADirectory)));
    }
}
