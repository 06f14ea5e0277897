//! `vmlink-primitives` — the binary contract between a host and its VM backends.
//!
//! This crate provides the fixed-width blobs, status and error codes, the
//! storage-status classifier, the `#[repr(C)]` layouts that cross the
//! boundary, and the owned execution result shared by the host side, the
//! backend side and the loader.

pub mod types;
pub mod status;
pub mod storage;
pub mod error;
pub mod ffi;
pub mod execution;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    Address, Bytes32, CallKind, Capability, CapabilitySet, Revision, Uint256, ABI_VERSION,
    SYMBOL_PREFIX, ZERO_ADDRESS, ZERO_BYTES32,
};
pub use status::StatusCode;
pub use storage::StorageStatus;
pub use error::{LoaderErrorCode, MessageError, SetOptionError, SetOptionResult};
pub use execution::{ExecutionResult, Message, TxContext};
