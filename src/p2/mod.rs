//! Preview-2 scaffolding (§4.10): a minimal, non-functional surface for three
//! `wasi:*` worlds the original extension host's design references as future
//! collaborators. This module carries no behavior beyond what is documented
//! on each item below; it exists only so a guest compiled against a newer
//! `wasi:*` world can be instantiated and receive a well-defined error
//! instead of a link failure. It must never be mistaken for a working
//! preview-2 host.

pub mod clocks;
pub mod http;
pub mod io;
