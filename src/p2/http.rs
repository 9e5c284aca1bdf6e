//! `wasi:http/types` (§4.10): type-only stubs. No request can currently be
//! issued through this host; these types exist purely as a seam for future
//! work, matching the original scope note that preview-2 interfaces are
//! "referenced here only as a future collaborator."

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

/// Mirrors `wasi:http/types` `fields` (header list). No request path exists
/// to populate or read one yet.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    pub entries: Vec<(String, Vec<u8>)>,
}

/// Mirrors `wasi:http/types` `request-options`. Field types only; nothing in
/// this host constructs or honors one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub connect_timeout_ns: Option<u64>,
    pub first_byte_timeout_ns: Option<u64>,
    pub between_bytes_timeout_ns: Option<u64>,
}
