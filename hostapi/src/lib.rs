//! `vmlink-hostapi` — the host side of the vmlink VM connector.
//!
//! This crate provides:
//!
//! - `Host` trait — the state-access callbacks a backend invokes
//! - `HOST_INTERFACE` — the static C callback table dispatching to `Host`
//! - `HostContext` — the opaque token passed through `execute`
//! - `MemHost` — in-memory `Host` for testing

pub mod traits;
pub mod interface;
pub mod mem_host;

// Re-export commonly used types at the crate root.
pub use traits::Host;
pub use interface::{host_interface, HostContext, HOST_INTERFACE};
pub use mem_host::{Account, CallHandler, MemHost, StorageSlot};
