//! `vmlink-vm` — the backend side of the vmlink VM connector.
//!
//! A backend implements [`VmBackend`]; [`VmContainer`] lays it out as a C-ABI
//! `vmlink_vm` instance and [`declare_vm!`] exports the factory the loader
//! looks up.
//!
//! ## Architecture
//!
//! - [`backend::VmBackend`] — trait a backend implements
//! - [`container::VmContainer`] — instance header plus backend, with the
//!   generated `destroy`/`execute`/`get_capabilities`/`set_option` operations
//! - [`context::ExecutionContext`] — safe wrapper over the host callback table

pub mod backend;
pub mod container;
pub mod context;

pub use vmlink_primitives as primitives;
pub use vmlink_primitives::ffi;

pub use backend::VmBackend;
pub use container::VmContainer;
pub use context::ExecutionContext;

/// Export the factory function for a backend.
///
/// ```ignore
/// declare_vm!(MyVm => vmlink_create_my_vm);
/// ```
///
/// The symbol name must follow the loader's naming convention for the
/// library file, or be the bare `vmlink_create`.
#[macro_export]
macro_rules! declare_vm {
    ($backend:ty => $symbol:ident) => {
        #[no_mangle]
        pub extern "C" fn $symbol() -> *mut $crate::ffi::vmlink_vm {
            $crate::VmContainer::<$backend>::create()
        }
    };
}
