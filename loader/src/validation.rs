//! VM instance validation — ABI compatibility checks.
//!
//! Validates a freshly created instance before it is handed out. Checks:
//!
//! 1. ABI version equals the loader's expected version
//! 2. Mandatory operations present (`destroy`, `execute`, `get_capabilities`)
//! 3. Name and version are non-null, non-empty UTF-8
//!
//! A rejected instance is destroyed before the error is returned.

use core::ffi::{c_char, CStr};
use core::ptr::NonNull;

use log::warn;
use vmlink_primitives::ffi::vmlink_vm;

use crate::error::LoaderError;

/// Validate `vm`, destroying it on failure.
///
/// # Safety
/// `vm` must point to a live instance returned by a factory and not yet
/// destroyed.
pub(crate) unsafe fn validate_instance(
    vm: NonNull<vmlink_vm>,
    expected_abi_version: i32,
    path: &str,
) -> Result<(), LoaderError> {
    let header = vm.as_ref();

    let found = header.abi_version;
    if found != expected_abi_version {
        warn!(
            "{}: rejecting VM with ABI version {} (expected {})",
            path, found, expected_abi_version
        );
        destroy_rejected(vm, path);
        return Err(LoaderError::AbiVersionMismatch {
            path: path.to_string(),
            expected: expected_abi_version,
            found,
        });
    }

    let reason = if header.destroy.is_none() {
        Some("missing destroy operation")
    } else if header.execute.is_none() {
        Some("missing execute operation")
    } else if header.get_capabilities.is_none() {
        Some("missing get_capabilities operation")
    } else if !is_valid_label(header.name) {
        Some("name is not a non-empty UTF-8 string")
    } else if !is_valid_label(header.version) {
        Some("version is not a non-empty UTF-8 string")
    } else {
        None
    };

    match reason {
        None => Ok(()),
        Some(reason) => {
            warn!("{}: rejecting malformed VM instance: {}", path, reason);
            destroy_rejected(vm, path);
            Err(LoaderError::VmCreationFailure {
                path: path.to_string(),
                reason: reason.to_string(),
            })
        }
    }
}

unsafe fn is_valid_label(label: *const c_char) -> bool {
    !label.is_null() && matches!(CStr::from_ptr(label).to_str(), Ok(s) if !s.is_empty())
}

/// Destroy an instance that will not be handed out.
unsafe fn destroy_rejected(vm: NonNull<vmlink_vm>, path: &str) {
    match vm.as_ref().destroy {
        Some(destroy) => destroy(vm.as_ptr()),
        None => warn!("{}: rejected VM instance has no destroy operation; leaking it", path),
    }
}
