//! `VmContainer` — a [`VmBackend`] laid out as a C-ABI `vmlink_vm` instance.
//!
//! The instance header is the first field, so a pointer to the container is
//! a valid `*mut vmlink_vm`. The generated operations recover the container
//! from that pointer. They validate their arguments and never unwind across
//! the boundary: a panicking backend yields `InternalError`.

use core::ffi::{c_char, CStr};
use core::slice;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};
use vmlink_primitives::ffi::{
    vmlink_host_context, vmlink_host_interface, vmlink_message, vmlink_result, vmlink_vm,
};
use vmlink_primitives::{
    Capability, ExecutionResult, Message, Revision, SetOptionError, SetOptionResult, StatusCode,
    ABI_VERSION,
};

use crate::backend::VmBackend;
use crate::context::ExecutionContext;

/// A backend together with the instance header describing it.
#[repr(C)]
pub struct VmContainer<T: VmBackend> {
    header: vmlink_vm,
    backend: T,
}

impl<T: VmBackend> VmContainer<T> {
    pub fn new(backend: T) -> Self {
        Self {
            header: vmlink_vm {
                abi_version: ABI_VERSION,
                name: T::NAME.as_ptr(),
                version: T::VERSION.as_ptr(),
                destroy: Some(destroy::<T>),
                execute: Some(execute::<T>),
                get_capabilities: Some(get_capabilities::<T>),
                set_option: if T::CONFIGURABLE {
                    Some(set_option::<T>)
                } else {
                    None
                },
            },
            backend,
        }
    }

    /// Allocate an instance with `T::init()`. This is the factory body.
    pub fn create() -> *mut vmlink_vm {
        Box::new(Self::new(T::init())).into_raw()
    }

    /// Leak the container as an instance pointer. Ownership moves to whoever
    /// calls its `destroy` operation.
    pub fn into_raw(self: Box<Self>) -> *mut vmlink_vm {
        Box::into_raw(self) as *mut vmlink_vm
    }

    /// Mutable access to the header, for building deliberately malformed
    /// instances in tests.
    pub fn header_mut(&mut self) -> &mut vmlink_vm {
        &mut self.header
    }

    pub fn backend(&self) -> &T {
        &self.backend
    }

    /// # Safety
    /// `vm` must be null or a live instance created by `VmContainer<T>`.
    unsafe fn backend_mut<'a>(vm: *mut vmlink_vm) -> Option<&'a mut T> {
        (vm as *mut Self).as_mut().map(|container| &mut container.backend)
    }
}

unsafe extern "C" fn destroy<T: VmBackend>(vm: *mut vmlink_vm) {
    if vm.is_null() {
        return;
    }
    debug!("destroying {} instance", T::NAME.to_string_lossy());
    drop(Box::from_raw(vm as *mut VmContainer<T>));
}

unsafe extern "C" fn get_capabilities<T: VmBackend>(vm: *mut vmlink_vm) -> u32 {
    match VmContainer::<T>::backend_mut(vm) {
        Some(backend) => backend.capabilities().bits(),
        None => 0,
    }
}

/// Decode a NUL-terminated UTF-8 argument. A null pointer reads as "".
unsafe fn decode_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return Some("");
    }
    CStr::from_ptr(ptr).to_str().ok()
}

unsafe extern "C" fn set_option<T: VmBackend>(
    vm: *mut vmlink_vm,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    let Some(backend) = VmContainer::<T>::backend_mut(vm) else {
        return SetOptionResult::InvalidName.as_i32();
    };
    if name.is_null() {
        return SetOptionResult::InvalidName.as_i32();
    }
    let Some(name) = decode_str(name) else {
        return SetOptionResult::InvalidName.as_i32();
    };
    let Some(value) = decode_str(value) else {
        return SetOptionResult::InvalidValue.as_i32();
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| backend.set_option(name, value)))
        .unwrap_or(Err(SetOptionError::InvalidValue));
    match outcome {
        Ok(()) => SetOptionResult::Success.as_i32(),
        Err(err) => SetOptionResult::from(err).as_i32(),
    }
}

unsafe extern "C" fn execute<T: VmBackend>(
    vm: *mut vmlink_vm,
    host: *const vmlink_host_interface,
    context: *mut vmlink_host_context,
    rev: i32,
    msg: *const vmlink_message,
    code: *const u8,
    code_size: usize,
) -> vmlink_result {
    let Some(backend) = VmContainer::<T>::backend_mut(vm) else {
        return ExecutionResult::error(StatusCode::InternalError).into_raw();
    };
    let Some(raw_msg) = msg.as_ref() else {
        warn!("execute: null message");
        return ExecutionResult::error(StatusCode::InternalError).into_raw();
    };
    let code: &[u8] = if code.is_null() {
        if code_size != 0 {
            warn!("execute: null code with size {}", code_size);
            return ExecutionResult::error(StatusCode::InternalError).into_raw();
        }
        &[]
    } else {
        slice::from_raw_parts(code, code_size)
    };
    let message = match Message::from_raw(raw_msg) {
        Ok(message) => message,
        Err(err) => {
            warn!("execute: {}", err);
            return ExecutionResult::error(StatusCode::InternalError).into_raw();
        }
    };
    let Some(revision) = Revision::from_i32(rev) else {
        debug!("execute: unsupported revision {}", rev);
        return ExecutionResult::error(StatusCode::Rejected).into_raw();
    };

    let host = host.as_ref();
    if host.is_none() && !backend.capabilities().contains(Capability::Precompiles) {
        warn!("execute: null host interface for a backend that needs one");
        return ExecutionResult::error(StatusCode::InternalError).into_raw();
    }
    let mut exec_context = host.map(|host| ExecutionContext::new(host, context));

    let backend: &T = backend;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        backend.execute(revision, code, &message, exec_context.as_mut())
    }));
    match outcome {
        Ok(result) => result.into_raw(),
        Err(_) => {
            warn!("execute: {} panicked", T::NAME.to_string_lossy());
            ExecutionResult::error(StatusCode::InternalError).into_raw()
        }
    }
}
