//! C-callable loader entry points.
//!
//! Each function takes an optional `error_code` out-parameter that receives a
//! `LoaderErrorCode` value. On failure the diagnostic is available through
//! [`vmlink_last_error_msg`] on the same thread.

use core::ffi::{c_char, CStr};
use core::ptr;
use std::cell::RefCell;
use std::ffi::CString;

use vmlink_primitives::ffi::{vmlink_create_fn, vmlink_vm};
use vmlink_primitives::LoaderErrorCode;

use crate::error::LoaderError;
use crate::loader::{clear_last_error, last_error_message, record, Loader};

thread_local! {
    static RETURNED_MESSAGE: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Resolve the factory function of the library at `filename`.
///
/// Returns null on failure.
///
/// # Safety
/// `filename` must be null or a NUL-terminated string. `error_code` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vmlink_load(
    filename: *const c_char,
    error_code: *mut i32,
) -> Option<vmlink_create_fn> {
    let result = match filename_arg(filename) {
        Ok(path) => Loader::default().resolve(path).map(|factory| factory.create_fn()),
        Err(err) => failed(err),
    };
    report(result, error_code)
}

/// Resolve, create and validate an instance. The caller owns the returned
/// instance and releases it through its `destroy` operation.
///
/// # Safety
/// As for [`vmlink_load`].
#[no_mangle]
pub unsafe extern "C" fn vmlink_load_and_create(
    filename: *const c_char,
    error_code: *mut i32,
) -> *mut vmlink_vm {
    let result = match filename_arg(filename) {
        Ok(path) => Loader::default().resolve_and_create(path).map(|vm| vm.into_raw()),
        Err(err) => failed(err),
    };
    report(result, error_code).unwrap_or(ptr::null_mut())
}

/// Resolve, create and configure an instance from a configuration string
/// `<path>(,<name>[=<value>])*`.
///
/// # Safety
/// `config` must be null or a NUL-terminated string. `error_code` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn vmlink_load_and_configure(
    config: *const c_char,
    error_code: *mut i32,
) -> *mut vmlink_vm {
    let result = if config.is_null() {
        failed(LoaderError::InvalidArgument("null configuration".into()))
    } else {
        match CStr::from_ptr(config).to_str() {
            Ok(config) => Loader::default()
                .resolve_create_and_configure(config)
                .map(|vm| vm.into_raw()),
            Err(_) => failed(LoaderError::InvalidArgument(
                "configuration is not valid UTF-8".into(),
            )),
        }
    };
    report(result, error_code).unwrap_or(ptr::null_mut())
}

/// The diagnostic of the last failed loader call on this thread, or null.
///
/// Consumes the diagnostic. The pointer stays valid until the next call of
/// this function on the same thread.
#[no_mangle]
pub extern "C" fn vmlink_last_error_msg() -> *const c_char {
    let message = last_error_message()
        .map(|message| CString::new(message.replace('\0', "?")).unwrap_or_default());
    RETURNED_MESSAGE.with(|slot| {
        let mut slot = slot.borrow_mut();
        *slot = message;
        slot.as_ref().map_or(ptr::null(), |message| message.as_ptr())
    })
}

unsafe fn filename_arg<'a>(filename: *const c_char) -> Result<&'a str, LoaderError> {
    if filename.is_null() {
        return Err(LoaderError::CannotOpen {
            path: String::new(),
            reason: "null path".into(),
        });
    }
    let filename = CStr::from_ptr(filename);
    filename.to_str().map_err(|_| LoaderError::CannotOpen {
        path: filename.to_string_lossy().into_owned(),
        reason: "path is not valid UTF-8".into(),
    })
}

fn failed<T>(err: LoaderError) -> Result<T, LoaderError> {
    clear_last_error();
    record(Err(err))
}

unsafe fn report<T>(result: Result<T, LoaderError>, error_code: *mut i32) -> Option<T> {
    let code = match &result {
        Ok(_) => LoaderErrorCode::Success,
        Err(err) => err.code(),
    };
    if !error_code.is_null() {
        *error_code = code.as_i32();
    }
    result.ok()
}
