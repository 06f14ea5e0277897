//! Backend-side view of the host callback table.

use log::warn;
use vmlink_primitives::ffi::{vmlink_host_context, vmlink_host_interface};
use vmlink_primitives::{
    Address, Bytes32, ExecutionResult, Message, StorageStatus, TxContext,
};

/// The host callbacks and the opaque context pointer for one execution.
///
/// The context pointer is forwarded to every callback unchanged and never
/// inspected.
pub struct ExecutionContext<'a> {
    host: &'a vmlink_host_interface,
    context: *mut vmlink_host_context,
    tx_context: Option<TxContext>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(host: &'a vmlink_host_interface, context: *mut vmlink_host_context) -> Self {
        Self {
            host,
            context,
            tx_context: None,
        }
    }

    /// The transaction context. Fetched from the host on first use only.
    pub fn get_tx_context(&mut self) -> &TxContext {
        let (host, context) = (self.host, self.context);
        // SAFETY: the host guarantees its callbacks accept the context it passed to execute.
        self.tx_context
            .get_or_insert_with(|| unsafe { (host.get_tx_context)(context) })
    }

    pub fn account_exists(&self, address: &Address) -> bool {
        unsafe { (self.host.account_exists)(self.context, address) }
    }

    pub fn get_balance(&self, address: &Address) -> u64 {
        unsafe { (self.host.get_balance)(self.context, address) }
    }

    pub fn get_storage(&self, address: &Address, key: &Bytes32) -> Bytes32 {
        unsafe { (self.host.get_storage)(self.context, address, key) }
    }

    /// Write a storage slot. An undefined status from the host reads as
    /// `Assigned`.
    pub fn set_storage(&mut self, address: &Address, key: &Bytes32, value: &Bytes32) -> StorageStatus {
        let raw = unsafe { (self.host.set_storage)(self.context, address, key, value) };
        StorageStatus::from_i32(raw).unwrap_or_else(|| {
            warn!("host returned undefined storage status {}", raw);
            StorageStatus::Assigned
        })
    }

    /// Send a nested message. The returned result owns the host's output.
    pub fn call(&mut self, message: &Message<'_>) -> ExecutionResult {
        let raw = message.to_raw();
        // SAFETY: `raw` borrows `message.input`, which outlives the call. The
        // host hands over a live result that nothing else releases.
        unsafe { ExecutionResult::from_raw((self.host.call)(self.context, &raw)) }
    }

    pub fn get_block_hash(&self, number: i64) -> Bytes32 {
        unsafe { (self.host.get_block_hash)(self.context, number) }
    }

    pub fn spawn(&mut self, blob: &[u8]) -> Address {
        unsafe { (self.host.spawn)(self.context, blob.as_ptr(), blob.len()) }
    }

    pub fn deploy(&mut self, blob: &[u8]) -> Address {
        unsafe { (self.host.deploy)(self.context, blob.as_ptr(), blob.len()) }
    }
}
