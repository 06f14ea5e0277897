//! The factory functions the loader resolves.
//!
//! `vmlink_create` covers artifacts whose file name does not derive the
//! named symbol, such as the hashed copies under `target/*/deps/`.

use vmlink_vm::declare_vm;

use crate::vm::ExampleVm;

declare_vm!(ExampleVm => vmlink_create_example_vm);
declare_vm!(ExampleVm => vmlink_create);
