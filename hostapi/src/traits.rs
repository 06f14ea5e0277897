//! Host trait — the state-access callbacks a VM backend invokes.
//!
//! The `Host` trait is the Rust face of `vmlink_host_interface`. The static
//! vtable in [`crate::interface`] dispatches every C callback to it. This
//! trait works with Rust references and slices, never raw pointers.

use vmlink_primitives::{Address, Bytes32, ExecutionResult, Message, StorageStatus, TxContext};

/// Host-side implementation of the callback table.
///
/// One instance serves one execution (or a sequence of executions within a
/// transaction). Callbacks may recurse into another `execute` through
/// [`Host::call`]; nesting depth is carried in `Message::depth`.
pub trait Host {
    // ── Accounts ──

    /// Returns true if `address` names an existing account.
    fn account_exists(&self, address: &Address) -> bool;

    fn get_balance(&self, address: &Address) -> u64;

    // ── Storage ──

    /// Read a storage slot. Missing slots read as zero.
    fn get_storage(&self, address: &Address, key: &Bytes32) -> Bytes32;

    /// Write a storage slot and classify the write.
    ///
    /// The returned status is a pure function of the slot's original value,
    /// its current value and `value`; see [`StorageStatus::classify`].
    fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus;

    // ── Execution ──

    /// Execute a nested message. The result is owned by the caller.
    fn call(&mut self, msg: &Message<'_>) -> ExecutionResult;

    fn get_tx_context(&self) -> TxContext;

    /// Hash of block `number`, or zero if the host does not know it.
    fn get_block_hash(&self, number: i64) -> Bytes32;

    // ── Programs ──

    /// Create a program instance from a spawn blob and return its address.
    fn spawn(&mut self, blob: &[u8]) -> Address;

    /// Deploy a template and return its address.
    fn deploy(&mut self, blob: &[u8]) -> Address;
}
