//! Shared test helpers for integration tests.
//!
//! Provides counting test backends, factories for well-formed and malformed
//! instances, and a locator for the built `example_vm` shared library.
//!
//! Tests in one binary run in parallel, so every test that counts destroys
//! uses its own `CountedVm<ID>` slot.

#![allow(dead_code)]

use core::ffi::CStr;
use core::ptr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use vmlink_loader::StaticLibrary;
use vmlink_primitives::ffi::{vmlink_create_fn, vmlink_vm as RawVm};
use vmlink_primitives::{
    Capability, CapabilitySet, ExecutionResult, Message, Revision, SetOptionError, ABI_VERSION,
};
use vmlink_vm::{ExecutionContext, VmBackend, VmContainer};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

// ── Counting backend ──

pub const SLOTS: usize = 16;

static DESTROYS: [AtomicUsize; SLOTS] = [const { AtomicUsize::new(0) }; SLOTS];

/// Number of times an instance in slot `ID` has been destroyed.
pub fn destroys(id: usize) -> usize {
    DESTROYS[id].load(Ordering::SeqCst)
}

/// A backend whose destruction is counted per slot. Accepts the option
/// `mode=fast|slow`.
#[derive(Debug, Default)]
pub struct CountedVm<const ID: usize> {
    pub mode: String,
}

impl<const ID: usize> Drop for CountedVm<ID> {
    fn drop(&mut self) {
        DESTROYS[ID].fetch_add(1, Ordering::SeqCst);
    }
}

impl<const ID: usize> VmBackend for CountedVm<ID> {
    const NAME: &'static CStr = c"counted_vm";
    const VERSION: &'static CStr = c"1.0.0";

    fn init() -> Self {
        Self {
            mode: "fast".into(),
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from(Capability::Bytecode)
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), SetOptionError> {
        match (name, value) {
            ("mode", "fast" | "slow") => {
                self.mode = value.to_string();
                Ok(())
            }
            ("mode", _) => Err(SetOptionError::InvalidValue),
            _ => Err(SetOptionError::InvalidName),
        }
    }

    fn execute(
        &self,
        _revision: Revision,
        _code: &[u8],
        message: &Message<'_>,
        _context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        ExecutionResult::success(message.gas, self.mode.as_bytes())
    }
}

/// A host-less backend advertising `Precompiles`. Returns its input doubled.
#[derive(Debug, Default)]
pub struct DoublingPrecompile;

impl VmBackend for DoublingPrecompile {
    const NAME: &'static CStr = c"doubling_precompile";
    const VERSION: &'static CStr = c"0.1.0";
    const CONFIGURABLE: bool = false;

    fn init() -> Self {
        Self
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from(Capability::Precompiles)
    }

    fn execute(
        &self,
        _revision: Revision,
        _code: &[u8],
        message: &Message<'_>,
        context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        assert!(context.is_none());
        ExecutionResult::with_output(
            vmlink_primitives::StatusCode::Success,
            message.gas - 10,
            message.input.iter().map(|b| b.wrapping_mul(2)).collect(),
        )
    }
}

// ── Factories ──

pub unsafe extern "C" fn create_counted<const ID: usize>() -> *mut RawVm {
    VmContainer::<CountedVm<ID>>::create()
}

/// An instance reporting ABI version 99.
pub unsafe extern "C" fn create_mismatched<const ID: usize>() -> *mut RawVm {
    let mut container = Box::new(VmContainer::new(CountedVm::<ID>::init()));
    container.header_mut().abi_version = ABI_VERSION + 99;
    container.into_raw()
}

/// An instance without an execute operation.
pub unsafe extern "C" fn create_without_execute<const ID: usize>() -> *mut RawVm {
    let mut container = Box::new(VmContainer::new(CountedVm::<ID>::init()));
    container.header_mut().execute = None;
    container.into_raw()
}

/// An instance with an empty name.
pub unsafe extern "C" fn create_unnamed<const ID: usize>() -> *mut RawVm {
    let mut container = Box::new(VmContainer::new(CountedVm::<ID>::init()));
    container.header_mut().name = c"".as_ptr();
    container.into_raw()
}

pub unsafe extern "C" fn create_null() -> *mut RawVm {
    ptr::null_mut()
}

pub unsafe extern "C" fn create_precompile() -> *mut RawVm {
    VmContainer::<DoublingPrecompile>::create()
}

/// A symbol table exporting `create` under the name derived from
/// `libcounted.so`.
pub fn counted_library(create: vmlink_create_fn) -> StaticLibrary {
    StaticLibrary::new().with_symbol("vmlink_create_counted", create)
}

// ── Built artifact ──

/// The `example_vm` shared library produced by the workspace build, if any.
///
/// `VMLINK_EXAMPLE_VM` overrides the search. Otherwise the newest
/// `libexample_vm*` next to the test binary's profile directory wins.
pub fn example_vm_artifact() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("VMLINK_EXAMPLE_VM") {
        return Some(PathBuf::from(path));
    }

    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let profile = deps.parent()?;
    let prefix = format!("{}example_vm", std::env::consts::DLL_PREFIX);
    let suffix = std::env::consts::DLL_SUFFIX;

    let mut found: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    for dir in [profile, deps] {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(suffix) {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::UNIX_EPOCH);
                found.push((modified, entry.path()));
            }
        }
    }
    found.into_iter().max_by_key(|(modified, _)| *modified).map(|(_, path)| path)
}
