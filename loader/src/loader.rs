//! The library loader.
//!
//! Three levels of convenience, each recording a diagnostic on failure:
//!
//! - [`Loader::resolve`]: open the library and find the factory
//! - [`Loader::resolve_and_create`]: also create and validate an instance
//! - [`Loader::resolve_create_and_configure`]: also apply the options of a
//!   configuration string, in order
//!
//! The diagnostic slot is thread-local. Every public call clears it on
//! entry; [`last_error_message`] returns it once.

use std::cell::RefCell;
use std::path::Path;
use std::ptr::NonNull;

use log::{debug, warn};
use vmlink_primitives::SetOptionError;

use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::library::{self, Factory, LoadedLibrary, SymbolSource};
use crate::naming::candidate_symbols;
use crate::options::{VmConfig, VmOption};
use crate::validation::validate_instance;
use crate::vm::Vm;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// The diagnostic recorded by the most recent failing loader call on this
/// thread, if any. Consumes it: a second call returns `None`.
pub fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

pub(crate) fn record<T>(result: Result<T, LoaderError>) -> Result<T, LoaderError> {
    if let Err(err) = &result {
        LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.to_string()));
    }
    result
}

/// Loads VM backends from shared libraries.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Open the library at `path` and find its factory function.
    pub fn resolve(&self, path: &str) -> Result<Factory, LoaderError> {
        clear_last_error();
        record(self.resolve_inner(path))
    }

    /// Find the factory for `path` in `source` instead of opening a file.
    pub fn resolve_from(&self, source: &dyn SymbolSource, path: &str) -> Result<Factory, LoaderError> {
        clear_last_error();
        record(find_factory(source, path))
    }

    /// Invoke `factory` and validate the instance it returns.
    pub fn create(&self, factory: &Factory) -> Result<Vm, LoaderError> {
        clear_last_error();
        record(self.create_inner(factory))
    }

    /// Apply `options` in order. On the first rejection the instance is
    /// destroyed and the error returned.
    pub fn configure(&self, vm: Vm, options: &[VmOption]) -> Result<Vm, LoaderError> {
        clear_last_error();
        record(configure_inner(vm, options))
    }

    pub fn resolve_and_create(&self, path: &str) -> Result<Vm, LoaderError> {
        clear_last_error();
        record(
            self.resolve_inner(path)
                .and_then(|factory| self.create_inner(&factory)),
        )
    }

    /// Parse `config` (`<path>(,<name>[=<value>])*`), then resolve, create
    /// and configure. No partially configured instance is ever returned.
    pub fn resolve_create_and_configure(&self, config: &str) -> Result<Vm, LoaderError> {
        clear_last_error();
        record(
            VmConfig::parse_with_limit(config, self.config.max_path_len)
                .and_then(|config| self.load_inner(&config)),
        )
    }

    /// Like [`Loader::resolve_create_and_configure`] for an already parsed
    /// configuration.
    pub fn load(&self, config: &VmConfig) -> Result<Vm, LoaderError> {
        clear_last_error();
        record(self.load_inner(config))
    }

    fn load_inner(&self, config: &VmConfig) -> Result<Vm, LoaderError> {
        let factory = self.resolve_inner(&config.path)?;
        let vm = self.create_inner(&factory)?;
        configure_inner(vm, &config.options)
    }

    fn resolve_inner(&self, path: &str) -> Result<Factory, LoaderError> {
        if path.is_empty() {
            return Err(LoaderError::CannotOpen {
                path: String::new(),
                reason: "empty path".into(),
            });
        }
        if path.len() > self.config.max_path_len {
            return Err(LoaderError::CannotOpen {
                path: path.to_string(),
                reason: format!("path longer than {} bytes", self.config.max_path_len),
            });
        }

        let library = library::open(Path::new(path), self.config.global_symbols).map_err(|err| {
            LoaderError::CannotOpen {
                path: path.to_string(),
                reason: err.to_string(),
            }
        })?;
        find_factory(&LoadedLibrary::new(library), path)
    }

    fn create_inner(&self, factory: &Factory) -> Result<Vm, LoaderError> {
        // SAFETY: the factory was found under a vmlink factory symbol.
        let raw = unsafe { (factory.create_fn())() };
        let Some(raw) = NonNull::new(raw) else {
            return Err(LoaderError::VmCreationFailure {
                path: factory.path().to_string(),
                reason: format!("{} returned null", factory.symbol()),
            });
        };

        // SAFETY: `raw` is a fresh instance owned by nobody else.
        unsafe {
            validate_instance(raw, self.config.expected_abi_version, factory.path())?;
            let vm = Vm::from_raw(raw, factory.path().to_string(), factory.library());
            debug!(
                "created {} {} from {}",
                vm.name(),
                vm.version(),
                factory.path()
            );
            Ok(vm)
        }
    }
}

fn find_factory(source: &dyn SymbolSource, path: &str) -> Result<Factory, LoaderError> {
    let tried = candidate_symbols(path);
    for symbol in &tried {
        if let Some(create) = source.lookup(symbol) {
            debug!("{}: found factory {}", path, symbol);
            return Ok(Factory::new(
                create,
                symbol.clone(),
                path.to_string(),
                source.library(),
            ));
        }
    }
    Err(LoaderError::SymbolNotFound {
        path: path.to_string(),
        tried,
    })
}

fn configure_inner(mut vm: Vm, options: &[VmOption]) -> Result<Vm, LoaderError> {
    for option in options {
        if let Err(err) = vm.set_option(&option.name, &option.value) {
            warn!(
                "{}: option {}={:?} rejected; destroying instance",
                vm.name(),
                option.name,
                option.value
            );
            let vm_name = vm.name().to_string();
            drop(vm);
            return Err(match err {
                SetOptionError::InvalidName => LoaderError::InvalidOptionName {
                    vm: vm_name,
                    name: option.name.clone(),
                },
                SetOptionError::InvalidValue => LoaderError::InvalidOptionValue {
                    vm: vm_name,
                    name: option.name.clone(),
                    value: option.value.clone(),
                },
            });
        }
    }
    Ok(vm)
}
