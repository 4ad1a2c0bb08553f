//! Library loading and unloading
//!
//! Opens the NVML shared library from a list of candidate paths. Resolving
//! symbols is the resolver's job; this module only owns the handle's
//! lifetime.

use libloading::Library;

use crate::dl::source::LoadedLibrary;
use crate::error::NvmlError;

/// Environment variable naming an explicit library path
pub const LIBRARY_ENV: &str = "NVML_DL_LIBRARY";

#[cfg(not(windows))]
const DEFAULT_LIBRARIES: &[&str] = &["libnvidia-ml.so.1", "libnvidia-ml.so"];

#[cfg(windows)]
const DEFAULT_LIBRARIES: &[&str] = &["nvml.dll"];

/// Loads the NVML library from an ordered list of candidates
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    paths: Vec<String>,
    use_env: bool,
    use_defaults: bool,
}

impl LibraryLoader {
    /// Loader trying the environment override, then the default sonames
    pub fn new() -> Self {
        Self {
            paths: Vec::new(),
            use_env: true,
            use_defaults: true,
        }
    }

    /// Add configured paths, tried after the environment override
    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Do not consult the environment override
    pub fn ignore_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Do not fall back to the default sonames
    pub fn without_defaults(mut self) -> Self {
        self.use_defaults = false;
        self
    }

    /// Candidate paths in the order they will be tried, without duplicates
    pub fn candidates(&self) -> Vec<String> {
        let env_path = if self.use_env {
            std::env::var(LIBRARY_ENV).ok()
        } else {
            None
        };
        self.candidates_with(env_path)
    }

    /// Candidate order given the value of [`LIBRARY_ENV`]
    fn candidates_with(&self, env_path: Option<String>) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(self.paths.len() + 3);

        let defaults: &[&str] = if self.use_defaults {
            DEFAULT_LIBRARIES
        } else {
            &[]
        };

        let all = env_path
            .filter(|p| !p.is_empty())
            .into_iter()
            .chain(self.paths.iter().cloned())
            .chain(defaults.iter().map(|p| p.to_string()));

        for path in all {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }

        candidates
    }

    /// Open the first candidate that loads
    pub fn load(&self) -> Result<LoadedLibrary, NvmlError> {
        let candidates = self.candidates();

        for candidate in &candidates {
            match open(candidate) {
                Ok(library) => {
                    log::info!("Loaded NVML library from {}", candidate);
                    return Ok(LoadedLibrary::new(library, candidate.clone()));
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", candidate, e);
                }
            }
        }

        Err(NvmlError::LibraryNotFound { tried: candidates })
    }

    /// Release a library handle
    ///
    /// Any pointer resolved from the library must not be called afterwards;
    /// resolved pointers borrow the library, so safe code cannot do so.
    pub fn unload(library: LoadedLibrary) -> Result<(), NvmlError> {
        let path = library.path().to_string();
        library.into_inner().close().map_err(|e| NvmlError::Unload {
            library: path.clone(),
            reason: e.to_string(),
        })?;
        log::debug!("Unloaded {}", path);
        Ok(())
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn open(path: &str) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: loading runs the library's initializers; NVML's are trusted.
    let library =
        unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL | libc::RTLD_NODELETE) }?;
    Ok(library.into())
}

#[cfg(not(unix))]
fn open(path: &str) -> Result<Library, libloading::Error> {
    // SAFETY: loading runs the library's initializers; NVML's are trusted.
    unsafe { Library::new(path) }
}
