//! Directory Iterator (C7, §4.7): packs a driver's restartable entry stream
//! into the guest's `fd_readdir` buffer. An entry never straddles the
//! buffer end — if the next header plus name would not fit, iteration
//! stops there and the caller re-enters with the last-yielded cookie.

use crate::errno::Result;
use crate::handle::Handle;
use crate::memory::{self, GuestMemory};
use crate::types::Dircookie;

/// Fills `buf_ptr[..buf_len]` with as many `dirent` (header + name) records
/// as fit, starting at `cookie`. Returns the number of bytes actually
/// written. Matches §4.7: "stop when the next header would not fit... an
/// entry never straddles the buffer end... the first cookie issued is 1".
pub fn fill_buffer(
    handle: &dyn Handle,
    mem: &mut dyn GuestMemory,
    cookie: Dircookie,
    buf_ptr: u32,
    buf_len: u32,
) -> Result<u32> {
    let mut written = 0u32;
    let mut entries = handle.readdir(cookie)?;

    loop {
        let remaining = buf_len.saturating_sub(written);
        if remaining < memory::DIRENT_LEN {
            break;
        }
        let (dirent, name) = match entries.next() {
            Some(item) => item?,
            None => break,
        };
        let name_bytes = name.as_bytes();
        let entry_len = memory::DIRENT_LEN + name_bytes.len() as u32;
        if entry_len > remaining {
            // Per spec: an entry never straddles the buffer end, even if
            // only the name would overflow — stop before writing it.
            break;
        }

        let entry_ptr = buf_ptr + written;
        memory::write_dirent_header(mem, entry_ptr, dirent)?;
        mem.write_bytes(entry_ptr + memory::DIRENT_LEN, name_bytes)?;
        written += entry_len;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memfs::MemDir;
    use crate::memory::VecMemory;
    use crate::types::{Fdflags, Oflags};

    #[test]
    fn empty_directory_still_writes_dot_and_dotdot() {
        let dir = MemDir::new(true);
        let mut mem = VecMemory::new(256);
        let n = fill_buffer(&dir, &mut mem, 0, 0, 256).unwrap();
        // "." (namlen 1) + ".." (namlen 2), each preceded by a DIRENT_LEN header.
        assert_eq!(n, 2 * memory::DIRENT_LEN + 1 + 2);
    }

    #[test]
    fn small_buffer_stops_before_overflow() {
        let dir = MemDir::new(true);
        for i in 1..=11 {
            dir.openat(&format!("test{i}.txt"), Oflags::CREAT, Fdflags::empty())
                .unwrap();
        }
        let mut mem = VecMemory::new(4096);
        let mut cookie = 0u64;
        let mut seen = std::collections::HashSet::new();
        loop {
            let n = fill_buffer(&dir, &mut mem, cookie, 0, 128).unwrap();
            if n == 0 {
                break;
            }
            let mut offset = 0u32;
            let mut last_cookie = cookie;
            while offset + memory::DIRENT_LEN <= n {
                let namlen = memory::read_u32(&mem, offset + 16).unwrap();
                let next = memory::read_u64(&mem, offset).unwrap();
                let name_ptr = offset + memory::DIRENT_LEN;
                let name = memory::read_string(&mem, name_ptr, namlen).unwrap();
                if name != "." && name != ".." {
                    seen.insert(name);
                }
                offset += memory::DIRENT_LEN + namlen;
                last_cookie = next;
            }
            if last_cookie == cookie {
                break;
            }
            cookie = last_cookie;
        }
        let expected: std::collections::HashSet<String> =
            (1..=11).map(|i| format!("test{i}.txt")).collect();
        assert_eq!(seen, expected);
    }
}
