//! C layouts of the vmlink ABI.
//!
//! Every struct here is `#[repr(C)]` and must stay bit-exact across
//! independently compiled hosts and backends. Enumerated values travel as
//! plain integers; use the typed enums in this crate to interpret them.

#![allow(non_camel_case_types)]

use core::ffi::c_char;

use serde::{Deserialize, Serialize};

use crate::types::{Address, Bytes32};

pub type vmlink_bytes32 = Bytes32;
pub type vmlink_uint256be = Bytes32;
pub type vmlink_address = Address;

/// One execution request.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct vmlink_message {
    /// `CallKind` value.
    pub kind: i32,
    pub depth: i32,
    pub gas: i64,
    pub recipient: vmlink_address,
    pub sender: vmlink_address,
    pub sender_template: vmlink_address,
    /// Borrowed input. May be null only if `input_size` is 0.
    pub input_data: *const u8,
    pub input_size: usize,
    pub value: u64,
}

/// Read-only transaction and block environment supplied by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct vmlink_tx_context {
    pub tx_gas_price: u64,
    pub tx_origin: vmlink_address,
    pub block_height: i64,
    pub block_timestamp: i64,
    pub block_gas_limit: i64,
    pub chain_id: vmlink_uint256be,
}

/// Releases the resources attached to a result. Called at most once.
pub type vmlink_release_result_fn = unsafe extern "C" fn(result: *const vmlink_result);

/// The result of one execution.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct vmlink_result {
    /// `StatusCode` value. Backends may use undefined negative values.
    pub status_code: i32,
    pub gas_left: i64,
    pub output_data: *const u8,
    pub output_size: usize,
    pub release: Option<vmlink_release_result_fn>,
}

/// Opaque host execution context. Backends forward the pointer unchanged.
#[repr(C)]
pub struct vmlink_host_context {
    _private: [u8; 0],
}

pub type vmlink_account_exists_fn =
    unsafe extern "C" fn(context: *mut vmlink_host_context, address: *const vmlink_address) -> bool;

pub type vmlink_get_storage_fn = unsafe extern "C" fn(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
    key: *const vmlink_bytes32,
) -> vmlink_bytes32;

/// Returns a `StorageStatus` value.
pub type vmlink_set_storage_fn = unsafe extern "C" fn(
    context: *mut vmlink_host_context,
    address: *const vmlink_address,
    key: *const vmlink_bytes32,
    value: *const vmlink_bytes32,
) -> i32;

pub type vmlink_get_balance_fn =
    unsafe extern "C" fn(context: *mut vmlink_host_context, address: *const vmlink_address) -> u64;

pub type vmlink_call_fn =
    unsafe extern "C" fn(context: *mut vmlink_host_context, msg: *const vmlink_message) -> vmlink_result;

pub type vmlink_get_tx_context_fn =
    unsafe extern "C" fn(context: *mut vmlink_host_context) -> vmlink_tx_context;

pub type vmlink_get_block_hash_fn =
    unsafe extern "C" fn(context: *mut vmlink_host_context, number: i64) -> vmlink_bytes32;

pub type vmlink_spawn_fn = unsafe extern "C" fn(
    context: *mut vmlink_host_context,
    blob: *const u8,
    blob_size: usize,
) -> vmlink_address;

pub type vmlink_deploy_fn = unsafe extern "C" fn(
    context: *mut vmlink_host_context,
    blob: *const u8,
    blob_size: usize,
) -> vmlink_address;

/// The host callback table. All entries are mandatory.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct vmlink_host_interface {
    pub account_exists: vmlink_account_exists_fn,
    pub get_storage: vmlink_get_storage_fn,
    pub set_storage: vmlink_set_storage_fn,
    pub get_balance: vmlink_get_balance_fn,
    pub call: vmlink_call_fn,
    pub get_tx_context: vmlink_get_tx_context_fn,
    pub get_block_hash: vmlink_get_block_hash_fn,
    pub spawn: vmlink_spawn_fn,
    pub deploy: vmlink_deploy_fn,
}

pub type vmlink_destroy_fn = unsafe extern "C" fn(vm: *mut vmlink_vm);

/// Returns a `SetOptionResult` value.
pub type vmlink_set_option_fn =
    unsafe extern "C" fn(vm: *mut vmlink_vm, name: *const c_char, value: *const c_char) -> i32;

/// `rev` is a `Revision` value. `host` may be null only for backends with
/// the precompiles capability.
pub type vmlink_execute_fn = unsafe extern "C" fn(
    vm: *mut vmlink_vm,
    host: *const vmlink_host_interface,
    context: *mut vmlink_host_context,
    rev: i32,
    msg: *const vmlink_message,
    code: *const u8,
    code_size: usize,
) -> vmlink_result;

pub type vmlink_get_capabilities_fn = unsafe extern "C" fn(vm: *mut vmlink_vm) -> u32;

/// The VM instance header.
///
/// `destroy`, `execute` and `get_capabilities` are mandatory; `set_option`
/// may be null. Backends embed this struct as the first field of their
/// instance.
#[repr(C)]
pub struct vmlink_vm {
    pub abi_version: i32,
    /// NUL-terminated, non-empty UTF-8.
    pub name: *const c_char,
    /// NUL-terminated, non-empty UTF-8.
    pub version: *const c_char,
    pub destroy: Option<vmlink_destroy_fn>,
    pub execute: Option<vmlink_execute_fn>,
    pub get_capabilities: Option<vmlink_get_capabilities_fn>,
    pub set_option: Option<vmlink_set_option_fn>,
}

/// Signature of the factory function exported by a backend library.
pub type vmlink_create_fn = unsafe extern "C" fn() -> *mut vmlink_vm;
