//! Console/tty device (§4.9a): a thin, non-seekable adapter over the host's
//! byte sink/source contract (§6 items 5-6). Grounded on the teacher's
//! `OsOther`/unix stdio handling in `sys/osother.rs`, simplified since this
//! host never touches a real OS file descriptor — every byte crosses the
//! `TtySink`/`TtySource` trait boundary instead.

use crate::drivers::DeviceId;
use crate::errno::{Error, Result};
use crate::handle::Handle;
use crate::types::{Filesize, Filestat, Filetype};
use std::any::Any;
use std::io::{IoSlice, IoSliceMut};
use std::rc::Rc;

/// Host-provided sink for console/tty writes (§6.6 `write(uri, bytes)`).
pub trait TtySink: std::fmt::Debug {
    fn write(&self, bytes: &[u8]) -> std::io::Result<usize>;
}

/// Host-provided source for console/tty reads (§6.6 `read(uri, max)`).
pub trait TtySource: std::fmt::Debug {
    fn read(&self, max: usize) -> std::io::Result<Vec<u8>>;

    /// `poll_oneoff` readiness probe (§4.8): "tty stdin is readable when the
    /// byte-source reports data". Defaults to always-ready so a simple
    /// source doesn't need to implement this to be usable.
    fn ready(&self) -> bool {
        true
    }
}

/// A console/tty handle. `sink`/`source` are optional independently: stdout
/// and stderr carry only a sink, stdin only a source, matching how a host
/// wires up fds 0/1/2 in `WasiCtxBuilder` (§4.9a).
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    sink: Option<Rc<dyn TtySink>>,
    source: Option<Rc<dyn TtySource>>,
}

impl ConsoleHandle {
    pub fn new(sink: Option<Rc<dyn TtySink>>, source: Option<Rc<dyn TtySource>>) -> Self {
        Self { sink, source }
    }

    pub fn sink_only(sink: Rc<dyn TtySink>) -> Self {
        Self::new(Some(sink), None)
    }

    pub fn source_only(source: Rc<dyn TtySource>) -> Self {
        Self::new(None, Some(source))
    }
}

impl Handle for ConsoleHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn try_clone(&self) -> std::io::Result<Box<dyn Handle>> {
        Ok(Box::new(self.clone()))
    }

    fn file_type(&self) -> Filetype {
        Filetype::CharacterDevice
    }

    fn filestat(&self) -> Result<Filestat> {
        Ok(Filestat {
            dev: DeviceId::Console as u64,
            ino: 0,
            filetype: Filetype::CharacterDevice,
            nlink: 1,
            size: 0,
            atim: 0,
            mtim: 0,
            ctim: 0,
        })
    }

    fn read(&self, bufs: &mut [IoSliceMut]) -> Result<usize> {
        let source = self.source.as_ref().ok_or(Error::BadFileDescriptor)?;
        let mut total = 0usize;
        for buf in bufs.iter_mut() {
            if buf.is_empty() {
                continue;
            }
            let bytes = source.read(buf.len())?;
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            total += n;
            if n < buf.len() {
                break;
            }
        }
        Ok(total)
    }

    fn write(&self, bufs: &[IoSlice]) -> Result<usize> {
        let sink = self.sink.as_ref().ok_or(Error::BadFileDescriptor)?;
        let mut total = 0usize;
        for buf in bufs.iter() {
            total += sink.write(buf)?;
        }
        Ok(total)
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn datasync(&self) -> Result<()> {
        Ok(())
    }

    fn poll_readable(&self) -> bool {
        match &self.source {
            Some(source) => source.ready(),
            None => false,
        }
    }

    fn poll_writable(&self) -> bool {
        self.sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingSink {
        buf: RefCell<Vec<u8>>,
    }

    impl TtySink for RecordingSink {
        fn write(&self, bytes: &[u8]) -> std::io::Result<usize> {
            self.buf.borrow_mut().extend_from_slice(bytes);
            Ok(bytes.len())
        }
    }

    #[derive(Debug)]
    struct FixedSource(Vec<u8>);

    impl TtySource for FixedSource {
        fn read(&self, max: usize) -> std::io::Result<Vec<u8>> {
            Ok(self.0.iter().take(max).copied().collect())
        }
    }

    #[test]
    fn write_reaches_sink() {
        let sink = Rc::new(RecordingSink::default());
        let console = ConsoleHandle::sink_only(sink.clone());
        let n = console.write(&[IoSlice::new(b"hello")]).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&*sink.buf.borrow(), b"hello");
    }

    #[test]
    fn read_without_source_fails_badf() {
        let console = ConsoleHandle::sink_only(Rc::new(RecordingSink::default()));
        let mut buf = vec![0u8; 4];
        let err = console.read(&mut [IoSliceMut::new(&mut buf)]);
        assert!(matches!(err, Err(Error::BadFileDescriptor)));
    }

    #[test]
    fn seek_is_unsupported() {
        let console = ConsoleHandle::sink_only(Rc::new(RecordingSink::default()));
        assert!(matches!(
            console.seek(std::io::SeekFrom::Start(0)),
            Err(Error::InvalidSeek)
        ));
    }

    #[test]
    fn read_reports_available_bytes() {
        let source = Rc::new(FixedSource(b"hi".to_vec()));
        let console = ConsoleHandle::source_only(source);
        let mut buf = vec![0u8; 10];
        let n = console.read(&mut [IoSliceMut::new(&mut buf)]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..2], b"hi");
    }
}
