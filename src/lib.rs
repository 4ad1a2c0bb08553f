//! nvml-dl - runtime-resolved NVML bindings
//!
//! Loads NVIDIA's management library at runtime and resolves its entry
//! points by name when they are called, so a binary built against this
//! crate starts on machines without the driver and degrades per call on
//! drivers that lack newer exports.
//!
//! # Modules
//!
//! - [`dl`]: Library loading and symbol resolution
//! - [`nvml`]: Typed NVML calls built on the resolver
//! - [`domain`]: Rust types for NVML enums and records
//! - [`error`]: Error types
//! - [`config`]: Configuration system
//! - [`cli`]: Command-line interface definitions
//! - [`commands`]: Command handlers

pub mod cli;
pub mod commands;
pub mod config;
pub mod dl;
pub mod domain;
pub mod error;
pub mod nvml;

#[cfg(test)]
pub mod mock;

pub use error::{AppError, Result};
