//! `example-vm` — reference backend for the vmlink VM connector.
//!
//! Built as a `cdylib` named `example_vm`, so the loader derives the factory
//! symbol `vmlink_create_example_vm` from `libexample_vm.so`; the bare
//! `vmlink_create` is exported too. The `rlib` output lets tests link the
//! backend statically.
//!
//! Execution model:
//!
//! - cost is `BASE_GAS + input.len() * gas_per_byte`
//! - code starting with `0xFD` reverts with the input as output
//! - otherwise slot 0 of the recipient counts calls, and the input is
//!   echoed back as output
//!
//! Options: `gas-per-byte=<u32>`, `trace` / `trace=on|off`.

// ── Modules ──

mod vm;
mod exports;

pub use vm::{ExampleVm, BASE_GAS, DEFAULT_GAS_PER_BYTE, REVERT_MARKER};
pub use exports::{vmlink_create, vmlink_create_example_vm};
