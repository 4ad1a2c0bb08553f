//! Resolver tests against the system C library
//!
//! These need no GPU: libc is always loaded, so its exports stand in for a
//! vendor library's.

#![cfg(target_os = "linux")]

use std::os::raw::c_int;

use libloading::Library;
use nvml_dl::dl::{resolve, LibraryLoader, Resolver};
use nvml_dl::error::ResolveError;

type GetPidFn = unsafe extern "C" fn() -> c_int;

const LIBC: &str = "libc.so.6";

fn libc() -> Library {
    unsafe { Library::new(LIBC) }.unwrap()
}

#[test]
fn test_absent_symbol_is_not_found() {
    let library = libc();
    let result = unsafe { resolve::<_, GetPidFn>(&library, "nvml_dl_definitely_absent") };

    match result {
        Err(ResolveError::SymbolNotFound { symbol, .. }) => {
            assert_eq!(symbol, "nvml_dl_definitely_absent")
        }
        Ok(_) => panic!("absent symbol resolved"),
    }
}

#[test]
fn test_present_symbol_calls_through() {
    let library = libc();
    let getpid = unsafe { resolve::<_, GetPidFn>(&library, "getpid") }.unwrap();

    let pid = unsafe { getpid() };
    assert_eq!(pid as u32, std::process::id());
}

#[test]
fn test_double_resolve_is_interchangeable() {
    let library = libc();
    let first = unsafe { resolve::<_, GetPidFn>(&library, "getpid") }.unwrap();
    let second = unsafe { resolve::<_, GetPidFn>(&library, "getpid") }.unwrap();

    assert_eq!(first.into_raw() as usize, second.into_raw() as usize);
    assert_eq!(unsafe { first() }, unsafe { second() });
}

#[test]
fn test_invalid_names_are_not_found() {
    let library = libc();
    assert!(unsafe { resolve::<_, GetPidFn>(&library, "") }.is_err());
    assert!(unsafe { resolve::<_, GetPidFn>(&library, "get\0pid") }.is_err());
}

#[test]
fn test_non_pointer_target_is_refused() {
    let library = libc();
    assert!(unsafe { resolve::<_, u8>(&library, "getpid") }.is_err());
}

#[test]
fn test_resolver_owns_loaded_library() {
    let library = LibraryLoader::new()
        .ignore_env()
        .without_defaults()
        .with_paths([LIBC])
        .load()
        .unwrap();
    assert_eq!(library.path(), LIBC);

    let resolver = Resolver::new(library);
    assert!(resolver.contains("getpid"));
    assert!(!resolver.contains("nvmlInit_v2"));

    let pid = {
        let getpid = unsafe { resolver.resolve::<GetPidFn>("getpid") }.unwrap();
        unsafe { getpid() }
    };
    assert_eq!(pid as u32, std::process::id());

    LibraryLoader::unload(resolver.into_source()).unwrap();
}
