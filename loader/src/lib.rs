//! `vmlink-loader` — dynamic loader for vmlink VM backends.
//!
//! This crate opens a backend's shared library, finds its factory function,
//! creates an instance and validates it before handing it out. It enforces:
//!
//! - **Symbol naming:** `vmlink_create_<base name>` first, then the bare
//!   `vmlink_create`
//! - **ABI validation:** version and mandatory operations checked before
//!   any instance is returned
//! - **Configuration:** options from a `<path>,<name>=<value>` string applied
//!   in order; a rejected option destroys the instance
//! - **Diagnostics:** a per-thread, read-once message for the last failure
//!
//! The primary entry point is [`Loader::resolve_create_and_configure`]; the
//! [`capi`] module exposes the same operations to C callers.

pub mod error;
pub mod config;
pub mod naming;
pub mod options;
pub mod library;
mod validation;
pub mod vm;
pub mod loader;
pub mod capi;

pub use error::LoaderError;
pub use config::LoaderConfig;
pub use library::{Factory, LoadedLibrary, StaticLibrary, SymbolSource};
pub use loader::{last_error_message, Loader};
pub use options::{VmConfig, VmOption};
pub use vm::Vm;
