//! Dynamic library cache and symbol lookup.
//!
//! Libraries are opened once per path and kept in a process-wide cache, so
//! resolving the same path twice reuses the open handle. Cached libraries
//! stay loaded for the life of the process; instances created from them may
//! outlive any `Vm` handle after crossing the C surface.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use libloading::Library;
use log::debug;
use once_cell::sync::Lazy;
use vmlink_primitives::ffi::vmlink_create_fn;

static LIBRARIES: Lazy<Mutex<HashMap<PathBuf, Arc<Library>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Open `path`, or return the cached handle if it is already open.
pub fn open(path: &Path, global_symbols: bool) -> Result<Arc<Library>, libloading::Error> {
    let mut libraries = LIBRARIES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(library) = libraries.get(path) {
        return Ok(Arc::clone(library));
    }

    // SAFETY: loading a library runs its initializers. The caller chose to
    // trust the library at `path`.
    let library = Arc::new(unsafe { open_native(path, global_symbols)? });
    debug!("opened library {}", path.display());
    libraries.insert(path.to_path_buf(), Arc::clone(&library));
    Ok(library)
}

/// Returns true if `path` is in the cache.
pub fn is_cached(path: &Path) -> bool {
    LIBRARIES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains_key(path)
}

#[cfg(unix)]
unsafe fn open_native(path: &Path, global_symbols: bool) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LOCAL, RTLD_NOW};

    let visibility = if global_symbols { RTLD_GLOBAL } else { RTLD_LOCAL };
    UnixLibrary::open(Some(path), RTLD_NOW | visibility).map(Library::from)
}

#[cfg(not(unix))]
unsafe fn open_native(path: &Path, _global_symbols: bool) -> Result<Library, libloading::Error> {
    Library::new(path)
}

// ── Symbol sources ──

/// Somewhere factory symbols can be looked up.
pub trait SymbolSource {
    fn lookup(&self, symbol: &str) -> Option<vmlink_create_fn>;

    /// The library that must stay loaded while instances from it live.
    fn library(&self) -> Option<Arc<Library>> {
        None
    }
}

/// A library opened from disk.
pub struct LoadedLibrary {
    library: Arc<Library>,
}

impl LoadedLibrary {
    pub fn new(library: Arc<Library>) -> Self {
        Self { library }
    }
}

impl SymbolSource for LoadedLibrary {
    fn lookup(&self, symbol: &str) -> Option<vmlink_create_fn> {
        // SAFETY: factory symbols are declared with the `vmlink_create_fn`
        // signature by every backend.
        unsafe { self.library.get::<vmlink_create_fn>(symbol.as_bytes()) }
            .ok()
            .map(|symbol| *symbol)
    }

    fn library(&self) -> Option<Arc<Library>> {
        Some(Arc::clone(&self.library))
    }
}

/// An in-process table of factories, for backends linked statically.
#[derive(Default, Clone)]
pub struct StaticLibrary {
    symbols: HashMap<String, vmlink_create_fn>,
}

impl StaticLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>, create: vmlink_create_fn) -> Self {
        self.symbols.insert(symbol.into(), create);
        self
    }
}

impl SymbolSource for StaticLibrary {
    fn lookup(&self, symbol: &str) -> Option<vmlink_create_fn> {
        self.symbols.get(symbol).copied()
    }
}

impl fmt::Debug for StaticLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLibrary")
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── Factory ──

/// A resolved factory function and where it came from.
#[derive(Clone)]
pub struct Factory {
    create: vmlink_create_fn,
    symbol: String,
    path: String,
    library: Option<Arc<Library>>,
}

impl Factory {
    pub(crate) fn new(
        create: vmlink_create_fn,
        symbol: String,
        path: String,
        library: Option<Arc<Library>>,
    ) -> Self {
        Self {
            create,
            symbol,
            path,
            library,
        }
    }

    /// The symbol the factory was found under.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw factory function.
    pub fn create_fn(&self) -> vmlink_create_fn {
        self.create
    }

    pub(crate) fn library(&self) -> Option<Arc<Library>> {
        self.library.clone()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("symbol", &self.symbol)
            .field("path", &self.path)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;
    use vmlink_primitives::ffi::vmlink_vm;

    unsafe extern "C" fn null_factory() -> *mut vmlink_vm {
        ptr::null_mut()
    }

    #[test]
    fn test_static_lookup() {
        let lib = StaticLibrary::new().with_symbol("vmlink_create", null_factory);
        assert!(lib.lookup("vmlink_create").is_some());
        assert!(lib.lookup("vmlink_create_other").is_none());
        assert!(lib.library().is_none());
    }

    #[test]
    fn test_open_missing_file_fails_and_is_not_cached() {
        let path = Path::new("/nonexistent/dir/libmissing_vm.so");
        assert!(open(path, true).is_err());
        assert!(!is_cached(path));
    }
}
