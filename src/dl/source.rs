//! Export tables that symbols are resolved against
//!
//! [`SymbolSource`] is the seam between the resolver and whatever holds the
//! export table: a real shared library in production, an in-process table of
//! `extern "C"` functions in tests.

use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use libloading::Library;

/// Something that can map an exported name to an address
pub trait SymbolSource: Send + Sync {
    /// Look up `name` in the export table
    ///
    /// Returns `None` when the name is absent or resolves to NULL. Must not
    /// panic and must not leave state behind that affects other lookups.
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>>;

    /// Human-readable description used in error messages
    fn describe(&self) -> String;
}

impl SymbolSource for Library {
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: the symbol is read as an untyped address; nothing is called
        // or dereferenced here.
        let symbol = unsafe { self.get::<*mut c_void>(name.to_bytes_with_nul()) }.ok()?;
        NonNull::new(*symbol)
    }

    fn describe(&self) -> String {
        "shared library".to_string()
    }
}

/// A loaded library together with the path it was opened from
#[derive(Debug)]
pub struct LoadedLibrary {
    library: Library,
    path: String,
}

impl LoadedLibrary {
    /// Wrap an already opened library
    pub fn new(library: Library, path: impl Into<String>) -> Self {
        Self {
            library,
            path: path.into(),
        }
    }

    /// Path (or soname) the library was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Give up the wrapper and return the raw handle
    pub fn into_inner(self) -> Library {
        self.library
    }
}

impl SymbolSource for LoadedLibrary {
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>> {
        self.library.address(name)
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

impl<S: SymbolSource + ?Sized> SymbolSource for &S {
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>> {
        (**self).address(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: SymbolSource + ?Sized> SymbolSource for Box<S> {
    fn address(&self, name: &CStr) -> Option<NonNull<c_void>> {
        (**self).address(name)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
