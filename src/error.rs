//! Unified error types for nvml-dl
//!
//! This module defines all error types used throughout the crate.
//! Uses thiserror for ergonomic error definitions.

use crate::nvml::ReturnCode;

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from NVML operations
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),

    /// Error from configuration parsing/validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// GPU not found by index
    #[error("GPU not found: {0}")]
    GpuNotFound(String),

    /// No GPUs detected in the system
    #[error("No NVIDIA GPUs detected")]
    NoGpusFound,

    /// None of the selected GPUs can deliver events
    #[error("No selected GPU supports event notification")]
    NoEventSources,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        AppError::Nvml(NvmlError::Symbol(err))
    }
}

/// The single failure outcome of symbol resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The export table has no usable entry for the name
    #[error("symbol `{symbol}` not found in {library}")]
    SymbolNotFound { symbol: String, library: String },
}

impl ResolveError {
    /// Name of the symbol that failed to resolve
    pub fn symbol(&self) -> &str {
        match self {
            ResolveError::SymbolNotFound { symbol, .. } => symbol,
        }
    }
}

/// Errors from loading NVML or calling through it
#[derive(Error, Debug)]
pub enum NvmlError {
    /// None of the candidate library paths could be opened
    #[error("NVML library not found (tried: {}). Is the NVIDIA driver installed?", .tried.join(", "))]
    LibraryNotFound { tried: Vec<String> },

    /// Closing the library handle failed
    #[error("Failed to unload {library}: {reason}")]
    Unload { library: String, reason: String },

    /// An entry point could not be resolved
    #[error(transparent)]
    Symbol(#[from] ResolveError),

    /// NVML has not been initialized
    #[error("{function}: NVML is not initialized")]
    Uninitialized { function: &'static str },

    /// Operation not supported by this GPU
    #[error("{function}: operation not supported")]
    NotSupported { function: &'static str },

    /// Insufficient permissions
    #[error("{function}: insufficient permissions. Try running with sudo.")]
    NoPermission { function: &'static str },

    /// Query target does not exist
    #[error("{function}: not found")]
    NotFound { function: &'static str },

    /// Invalid argument passed to NVML
    #[error("{function}: invalid argument")]
    InvalidArgument { function: &'static str },

    /// GPU is lost (fallen off bus, etc.)
    #[error("{function}: GPU is lost or has become inaccessible")]
    GpuLost { function: &'static str },

    /// Wait expired without an event
    #[error("{function}: timed out")]
    Timeout { function: &'static str },

    /// Any other non-success return code
    #[error("{function} failed: {message} (code {})", .code.as_raw())]
    Call {
        function: &'static str,
        code: ReturnCode,
        message: String,
    },

    /// NVML reported success but returned no samples
    #[error("{function}: no samples available")]
    NoData { function: &'static str },

    /// A string argument could not be passed across the C boundary
    #[error("Invalid string argument: {0:?}")]
    InvalidString(String),
}

impl NvmlError {
    /// The vendor return code behind this error, if there is one
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            NvmlError::Uninitialized { .. } => Some(ReturnCode::Uninitialized),
            NvmlError::NotSupported { .. } => Some(ReturnCode::NotSupported),
            NvmlError::NoPermission { .. } => Some(ReturnCode::NoPermission),
            NvmlError::NotFound { .. } => Some(ReturnCode::NotFound),
            NvmlError::InvalidArgument { .. } => Some(ReturnCode::InvalidArgument),
            NvmlError::GpuLost { .. } => Some(ReturnCode::GpuIsLost),
            NvmlError::Timeout { .. } => Some(ReturnCode::Timeout),
            NvmlError::Call { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the GPU or driver simply lacks the feature
    pub fn is_not_supported(&self) -> bool {
        matches!(
            self,
            NvmlError::NotSupported { .. } | NvmlError::Symbol(ResolveError::SymbolNotFound { .. })
        )
    }
}

/// Errors from configuration parsing and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Invalid config value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
