//! `Vm` — owned handle to a loaded, validated VM instance.

use core::cell::Cell;
use core::ffi::CStr;
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::ffi::CString;
use std::fmt;
use std::sync::Arc;

use libloading::Library;
use log::{debug, warn};
use vmlink_hostapi::{Host, HostContext, HOST_INTERFACE};
use vmlink_primitives::ffi::vmlink_vm;
use vmlink_primitives::{
    Capability, CapabilitySet, ExecutionResult, Message, Revision, SetOptionError,
    SetOptionResult, StatusCode,
};

/// A VM instance created and validated by the loader.
///
/// Dropping the handle destroys the instance exactly once. The handle keeps
/// the library the instance came from loaded. It may move between threads
/// but is not `Sync`: one instance never executes concurrently with itself.
pub struct Vm {
    raw: NonNull<vmlink_vm>,
    path: String,
    _library: Option<Arc<Library>>,
    _not_sync: PhantomData<Cell<()>>,
}

// SAFETY: instances have no thread affinity; `Vm` is `!Sync`, so calls on
// one instance are serialized by ownership.
unsafe impl Send for Vm {}

impl Vm {
    /// # Safety
    /// `raw` must be a live instance that passed validation, owned by nobody
    /// else.
    pub(crate) unsafe fn from_raw(
        raw: NonNull<vmlink_vm>,
        path: String,
        library: Option<Arc<Library>>,
    ) -> Self {
        Self {
            raw,
            path,
            _library: library,
            _not_sync: PhantomData,
        }
    }

    /// Release ownership. The caller must eventually call the instance's
    /// `destroy` operation.
    pub fn into_raw(self) -> *mut vmlink_vm {
        let raw = self.raw.as_ptr();
        std::mem::forget(self);
        raw
    }

    fn header(&self) -> &vmlink_vm {
        // SAFETY: the instance is live until drop.
        unsafe { self.raw.as_ref() }
    }

    pub fn as_ptr(&self) -> *mut vmlink_vm {
        self.raw.as_ptr()
    }

    /// The library path or symbol source the instance was created from.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn abi_version(&self) -> i32 {
        self.header().abi_version
    }

    pub fn name(&self) -> &str {
        // SAFETY: validated as non-null NUL-terminated UTF-8 at creation.
        unsafe { CStr::from_ptr(self.header().name) }
            .to_str()
            .unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        unsafe { CStr::from_ptr(self.header().version) }
            .to_str()
            .unwrap_or_default()
    }

    /// Current capabilities. May change after `set_option`.
    pub fn capabilities(&self) -> CapabilitySet {
        match self.header().get_capabilities {
            Some(get_capabilities) => {
                CapabilitySet::from_bits(unsafe { get_capabilities(self.raw.as_ptr()) })
            }
            None => CapabilitySet::EMPTY,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// Apply one option. Instances without a set-option operation reject
    /// every name.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), SetOptionError> {
        let Some(set_option) = self.header().set_option else {
            return Err(SetOptionError::InvalidName);
        };
        let name_c = CString::new(name).map_err(|_| SetOptionError::InvalidName)?;
        let value_c = CString::new(value).map_err(|_| SetOptionError::InvalidValue)?;

        let raw = unsafe { set_option(self.raw.as_ptr(), name_c.as_ptr(), value_c.as_ptr()) };
        let outcome = match SetOptionResult::from_i32(raw) {
            Some(outcome) => outcome.into_result(),
            None => {
                warn!("{}: set_option returned undefined code {}", self.name(), raw);
                Err(SetOptionError::InvalidValue)
            }
        };
        if outcome.is_ok() {
            debug!("{}: option {}={:?} applied", self.name(), name, value);
        }
        outcome
    }

    /// Execute `code` with `host` serving the callbacks.
    pub fn execute(
        &self,
        host: &mut dyn Host,
        revision: Revision,
        message: &Message<'_>,
        code: &[u8],
    ) -> ExecutionResult {
        let mut context = HostContext::new(host);
        self.execute_raw(&HOST_INTERFACE, context.as_raw(), revision, message, code)
    }

    /// Execute without a host. Only backends advertising `Precompiles`
    /// accept this; others get `Rejected` without being called.
    pub fn execute_precompile(
        &self,
        revision: Revision,
        message: &Message<'_>,
        code: &[u8],
    ) -> ExecutionResult {
        if !self.has_capability(Capability::Precompiles) {
            return ExecutionResult::error(StatusCode::Rejected);
        }
        self.execute_raw(ptr::null(), ptr::null_mut(), revision, message, code)
    }

    fn execute_raw(
        &self,
        host: *const vmlink_primitives::ffi::vmlink_host_interface,
        context: *mut vmlink_primitives::ffi::vmlink_host_context,
        revision: Revision,
        message: &Message<'_>,
        code: &[u8],
    ) -> ExecutionResult {
        let Some(execute) = self.header().execute else {
            return ExecutionResult::error(StatusCode::InternalError);
        };
        let msg = message.to_raw();
        let code_ptr = if code.is_empty() { ptr::null() } else { code.as_ptr() };
        // SAFETY: every pointer outlives the call; the instance hands over a
        // result that only the returned value will release.
        unsafe {
            ExecutionResult::from_raw(execute(
                self.raw.as_ptr(),
                host,
                context,
                revision.as_i32(),
                &msg,
                code_ptr,
                code.len(),
            ))
        }
    }
}

impl Drop for Vm {
    fn drop(&mut self) {
        match self.header().destroy {
            Some(destroy) => unsafe { destroy(self.raw.as_ptr()) },
            None => warn!("{}: instance has no destroy operation; leaking it", self.path),
        }
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("abi_version", &self.abi_version())
            .field("path", &self.path)
            .finish()
    }
}
