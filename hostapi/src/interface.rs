//! The static C callback table and the opaque context token.
//!
//! A host wraps its [`Host`] in a [`HostContext`], passes
//! [`host_interface()`] and [`HostContext::as_raw`] to `execute`, and the
//! backend hands the context pointer back unchanged on every callback. The
//! trampolines below recover the context and dispatch to the trait.
//!
//! A null context or a null argument pointer never dereferences: the
//! callback logs a warning and answers with the zero value for its type.

use core::marker::PhantomData;
use core::slice;

use log::{trace, warn};
use vmlink_primitives::ffi::{
    vmlink_address, vmlink_bytes32, vmlink_host_context, vmlink_host_interface, vmlink_message,
    vmlink_result, vmlink_tx_context,
};
use vmlink_primitives::{
    Address, Bytes32, ExecutionResult, Message, StatusCode, StorageStatus, ZERO_ADDRESS,
    ZERO_BYTES32,
};

use crate::traits::Host;

/// Opaque execution context handed to a backend for one `execute` call.
///
/// The backend never interprets the pointer; it only forwards it to the
/// callbacks in [`HOST_INTERFACE`]. The token must outlive the call.
pub struct HostContext<'a> {
    host: &'a mut dyn Host,
    _not_send: PhantomData<*mut ()>,
}

impl<'a> HostContext<'a> {
    pub fn new(host: &'a mut dyn Host) -> Self {
        Self {
            host,
            _not_send: PhantomData,
        }
    }

    /// The pointer to pass as the `context` argument of `execute`.
    pub fn as_raw(&mut self) -> *mut vmlink_host_context {
        self as *mut Self as *mut vmlink_host_context
    }

    pub fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }
}

/// The callback table shared by every host built on this crate.
pub static HOST_INTERFACE: vmlink_host_interface = vmlink_host_interface {
    account_exists,
    get_storage,
    set_storage,
    get_balance,
    call,
    get_tx_context,
    get_block_hash,
    spawn,
    deploy,
};

/// Returns the shared callback table.
pub fn host_interface() -> &'static vmlink_host_interface {
    &HOST_INTERFACE
}

/// Run `f` against the host behind `context`, or return `None` if the
/// context pointer is null.
///
/// # Safety
/// `context` must be null or come from [`HostContext::as_raw`] on a token
/// that is still alive.
unsafe fn with_host<R>(
    context: *mut vmlink_host_context,
    callback: &'static str,
    f: impl FnOnce(&mut dyn Host) -> R,
) -> Option<R> {
    match (context as *mut HostContext<'_>).as_mut() {
        Some(ctx) => Some(f(&mut *ctx.host)),
        None => {
            warn!("{}: null host context", callback);
            None
        }
    }
}

unsafe fn read_address(address: *const vmlink_address, callback: &'static str) -> Option<Address> {
    let address = address.as_ref().copied();
    if address.is_none() {
        warn!("{}: null address", callback);
    }
    address
}

unsafe fn read_bytes32(value: *const vmlink_bytes32, callback: &'static str) -> Option<Bytes32> {
    let value = value.as_ref().copied();
    if value.is_none() {
        warn!("{}: null 32-byte argument", callback);
    }
    value
}

unsafe fn read_blob<'a>(blob: *const u8, size: usize, callback: &'static str) -> Option<&'a [u8]> {
    if blob.is_null() {
        if size != 0 {
            warn!("{}: null blob with size {}", callback, size);
            return None;
        }
        return Some(&[]);
    }
    Some(slice::from_raw_parts(blob, size))
}

// ── Trampolines ──

unsafe extern "C" fn account_exists(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
) -> bool {
    let Some(address) = read_address(address, "account_exists") else {
        return false;
    };
    trace!("account_exists({})", address);
    with_host(context, "account_exists", |host| host.account_exists(&address)).unwrap_or(false)
}

unsafe extern "C" fn get_storage(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
    key: *const vmlink_bytes32,
) -> vmlink_bytes32 {
    let (Some(address), Some(key)) = (
        read_address(address, "get_storage"),
        read_bytes32(key, "get_storage"),
    ) else {
        return ZERO_BYTES32;
    };
    trace!("get_storage({}, {})", address, key);
    with_host(context, "get_storage", |host| host.get_storage(&address, &key)).unwrap_or(ZERO_BYTES32)
}

unsafe extern "C" fn set_storage(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
    key: *const vmlink_bytes32,
    value: *const vmlink_bytes32,
) -> i32 {
    let (Some(address), Some(key), Some(value)) = (
        read_address(address, "set_storage"),
        read_bytes32(key, "set_storage"),
        read_bytes32(value, "set_storage"),
    ) else {
        return StorageStatus::Assigned.as_i32();
    };
    let status = with_host(context, "set_storage", |host| {
        host.set_storage(&address, &key, &value)
    })
    .unwrap_or(StorageStatus::Assigned);
    trace!("set_storage({}, {}, {}) -> {}", address, key, value, status);
    status.as_i32()
}

unsafe extern "C" fn get_balance(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
) -> u64 {
    let Some(address) = read_address(address, "get_balance") else {
        return 0;
    };
    trace!("get_balance({})", address);
    with_host(context, "get_balance", |host| host.get_balance(&address)).unwrap_or(0)
}

unsafe extern "C" fn call(
    context: *mut vmlink_host_context,
    msg: *const vmlink_message,
) -> vmlink_result {
    let Some(raw) = msg.as_ref() else {
        warn!("call: null message");
        return ExecutionResult::error(StatusCode::InternalError).into_raw();
    };
    let msg = match Message::from_raw(raw) {
        Ok(msg) => msg,
        Err(err) => {
            warn!("call: {}", err);
            return ExecutionResult::error(StatusCode::InternalError).into_raw();
        }
    };
    trace!(
        "call(depth={}, {} -> {}, gas={}, input={} bytes)",
        msg.depth,
        msg.sender,
        msg.recipient,
        msg.gas,
        msg.input.len()
    );
    match with_host(context, "call", |host| host.call(&msg)) {
        Some(result) => result.into_raw(),
        None => ExecutionResult::error(StatusCode::InternalError).into_raw(),
    }
}

unsafe extern "C" fn get_tx_context(context: *mut vmlink_host_context) -> vmlink_tx_context {
    trace!("get_tx_context()");
    with_host(context, "get_tx_context", |host| host.get_tx_context()).unwrap_or_default()
}

unsafe extern "C" fn get_block_hash(context: *mut vmlink_host_context, number: i64) -> vmlink_bytes32 {
    trace!("get_block_hash({})", number);
    with_host(context, "get_block_hash", |host| host.get_block_hash(number)).unwrap_or(ZERO_BYTES32)
}

unsafe extern "C" fn spawn(
    context: *mut vmlink_host_context,
    blob: *const u8,
    blob_size: usize,
) -> vmlink_address {
    let Some(blob) = read_blob(blob, blob_size, "spawn") else {
        return ZERO_ADDRESS;
    };
    let address = with_host(context, "spawn", |host| host.spawn(blob)).unwrap_or(ZERO_ADDRESS);
    trace!("spawn({} bytes) -> {}", blob.len(), address);
    address
}

unsafe extern "C" fn deploy(
    context: *mut vmlink_host_context,
    blob: *const u8,
    blob_size: usize,
) -> vmlink_address {
    let Some(blob) = read_blob(blob, blob_size, "deploy") else {
        return ZERO_ADDRESS;
    };
    let address = with_host(context, "deploy", |host| host.deploy(blob)).unwrap_or(ZERO_ADDRESS);
    trace!("deploy({} bytes) -> {}", blob.len(), address);
    address
}
