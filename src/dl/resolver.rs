//! Dynamic symbol resolver
//!
//! Resolves an exported name to a typed function pointer. Every call performs
//! a fresh lookup; nothing is cached. Failure is reported as
//! [`ResolveError::SymbolNotFound`] and never aborts the process.
//!
//! The returned [`Resolved`] borrows the source it came from, so a pointer
//! cannot be called after the library that owns it has been dropped or
//! unloaded. Invoking is just calling the pointer:
//!
//! ```no_run
//! use std::os::raw::c_uint;
//! use nvml_dl::dl::{resolve, LibraryLoader};
//!
//! let library = LibraryLoader::new().load()?;
//! let init = unsafe { resolve::<_, unsafe extern "C" fn() -> c_uint>(&library, "nvmlInit_v2")? };
//! let status = unsafe { init() };
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::ffi::{c_void, CString};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;

use crate::dl::source::SymbolSource;
use crate::error::ResolveError;

/// A function pointer resolved from a [`SymbolSource`]
///
/// Valid only while the source it was resolved from is alive, which the
/// `'lib` lifetime enforces.
pub struct Resolved<'lib, T> {
    pointer: T,
    _source: PhantomData<&'lib ()>,
}

impl<T: Copy> Resolved<'_, T> {
    /// The raw pointer value
    ///
    /// Copying the pointer out detaches it from the source lifetime; the
    /// caller takes over the obligation not to call it after unload.
    pub fn into_raw(self) -> T {
        self.pointer
    }
}

impl<T> Deref for Resolved<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.pointer
    }
}

impl<T: Copy> Clone for Resolved<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Copy> Copy for Resolved<'_, T> {}

impl<T> fmt::Debug for Resolved<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // T is pointer sized; read it back as an address for display
        let address: *const c_void = unsafe { mem::transmute_copy(&self.pointer) };
        f.debug_tuple("Resolved").field(&address).finish()
    }
}

/// Resolve `name` in `source` as a value of type `T`
///
/// `T` must be a pointer-sized type, normally an `unsafe extern "C" fn(..)`.
/// Empty names, names containing NUL, absent symbols and NULL addresses all
/// yield [`ResolveError::SymbolNotFound`].
///
/// # Safety
/// The caller asserts that `T` matches the signature of the exported
/// function. No signature validation is performed.
pub unsafe fn resolve<'lib, S, T>(source: &'lib S, name: &str) -> Result<Resolved<'lib, T>, ResolveError>
where
    S: SymbolSource + ?Sized,
    T: Copy,
{
    let not_found = || ResolveError::SymbolNotFound {
        symbol: name.to_string(),
        library: source.describe(),
    };

    if name.is_empty() {
        return Err(not_found());
    }

    if mem::size_of::<T>() != mem::size_of::<*mut c_void>() {
        log::debug!(
            "refusing to resolve {}: target type is {} bytes, not pointer sized",
            name,
            mem::size_of::<T>()
        );
        return Err(not_found());
    }

    let c_name = CString::new(name).map_err(|_| not_found())?;
    let address = source.address(&c_name).ok_or_else(not_found)?;
    log::debug!("resolved {} at {:p}", name, address);

    // SAFETY: size checked above; the caller vouches for the signature.
    let pointer = unsafe { mem::transmute_copy::<*mut c_void, T>(&address.as_ptr()) };

    Ok(Resolved {
        pointer,
        _source: PhantomData,
    })
}

/// Owns a symbol source and resolves names against it
#[derive(Debug)]
pub struct Resolver<S> {
    source: S,
}

impl<S: SymbolSource> Resolver<S> {
    /// Create a resolver over `source`
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Resolve `name` as a value of type `T`
    ///
    /// # Safety
    /// See [`resolve`].
    pub unsafe fn resolve<T: Copy>(&self, name: &str) -> Result<Resolved<'_, T>, ResolveError> {
        unsafe { resolve(&self.source, name) }
    }

    /// Whether `name` currently resolves to a non-NULL address
    pub fn contains(&self, name: &str) -> bool {
        CString::new(name)
            .ok()
            .filter(|_| !name.is_empty())
            .and_then(|c_name| self.source.address(&c_name))
            .is_some()
    }

    /// Borrow the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give up the resolver and return the source
    pub fn into_source(self) -> S {
        self.source
    }
}
