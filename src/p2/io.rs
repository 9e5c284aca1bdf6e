//! `wasi:io/streams` (§4.10): mirrors the `input-stream`/`output-stream`
//! resource handles of the component-model world, implemented only far
//! enough to report `closed` for anything this host does not back with a
//! preview-1 fd — this host has no byte-stream resource type distinct from a
//! `fd_*`-addressed [`crate::handle::Handle`], so there is nothing for these
//! resources to actually stream.

/// Mirrors `wasi:io/streams` `stream-error`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamError {
    Closed,
    LastOperationFailed,
}

/// Stands in for a `wasi:io/streams` `input-stream` resource. Every
/// preview-1-backed byte source is read through `fd_read`/`fd_pread`
/// instead; this type exists only so a guest that imports the interface
/// links and gets a well-defined closed stream rather than a trap.
#[derive(Debug, Default)]
pub struct InputStream;

impl InputStream {
    pub fn read(&self, _len: u64) -> Result<Vec<u8>, StreamError> {
        Err(StreamError::Closed)
    }

    pub fn blocking_read(&self, _len: u64) -> Result<Vec<u8>, StreamError> {
        Err(StreamError::Closed)
    }
}

/// Stands in for a `wasi:io/streams` `output-stream` resource; see
/// [`InputStream`].
#[derive(Debug, Default)]
pub struct OutputStream;

impl OutputStream {
    pub fn write(&self, _bytes: &[u8]) -> Result<u64, StreamError> {
        Err(StreamError::Closed)
    }

    pub fn flush(&self) -> Result<(), StreamError> {
        Err(StreamError::Closed)
    }
}
