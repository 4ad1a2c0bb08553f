//! Runtime symbol resolution
//!
//! Loading a shared library, looking up entry points by name, and the
//! table of NVML entry points callers resolve through.

pub mod loader;
pub mod resolver;
pub mod source;
pub mod symbols;

pub use loader::LibraryLoader;
pub use resolver::{resolve, Resolved, Resolver};
pub use source::SymbolSource;
pub use symbols::{EntryPoint, Group};
