//! Instance lifecycle tests — validation, configuration and destruction.
//!
//! Every instance the loader rejects must be destroyed exactly once, and
//! every instance it hands out must be destroyed exactly once on drop.

mod common;

use vmlink_hostapi::MemHost;
use vmlink_loader::{Loader, LoaderError, StaticLibrary, VmConfig, VmOption};
use vmlink_primitives::{Address, Capability, LoaderErrorCode, Message, Revision, StatusCode};

use common::*;

// ── Test: symbol lookup ──

#[test]
fn test_named_symbol_preferred_over_fallback() {
    init_logging();
    let source = StaticLibrary::new()
        .with_symbol("vmlink_create_counted", create_counted::<0>)
        .with_symbol("vmlink_create", create_null);
    let factory = Loader::default().resolve_from(&source, "/opt/vms/libcounted.so").unwrap();
    assert_eq!(factory.symbol(), "vmlink_create_counted");
    assert_eq!(factory.path(), "/opt/vms/libcounted.so");
}

#[test]
fn test_fallback_symbol() {
    let source = StaticLibrary::new().with_symbol("vmlink_create", create_counted::<1>);
    let factory = Loader::default().resolve_from(&source, "./other.so").unwrap();
    assert_eq!(factory.symbol(), "vmlink_create");
}

#[test]
fn test_symbol_not_found_lists_candidates() {
    let source = StaticLibrary::new().with_symbol("vmlink_create_other", create_null);
    let err = Loader::default()
        .resolve_from(&source, "/a/b/libexample-interpreter.so.1.0")
        .unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::SymbolNotFound);
    assert_eq!(
        err,
        LoaderError::SymbolNotFound {
            path: "/a/b/libexample-interpreter.so.1.0".into(),
            tried: vec![
                "vmlink_create_example_interpreter".into(),
                "vmlink_create".into()
            ],
        }
    );
}

// ── Test: creation and validation ──

#[test]
fn test_created_instance_destroyed_once_on_drop() {
    init_logging();
    let loader = Loader::default();
    let factory = loader.resolve_from(&counted_library(create_counted::<2>), "libcounted.so").unwrap();
    let vm = loader.create(&factory).unwrap();

    assert_eq!(vm.name(), "counted_vm");
    assert_eq!(vm.version(), "1.0.0");
    assert_eq!(vm.abi_version(), 0);
    assert_eq!(vm.path(), "libcounted.so");
    assert!(vm.has_capability(Capability::Bytecode));
    assert!(!vm.has_capability(Capability::Precompiles));
    assert_eq!(destroys(2), 0);

    drop(vm);
    assert_eq!(destroys(2), 1);
}

#[test]
fn test_abi_mismatch_destroys_instance_once() {
    init_logging();
    let loader = Loader::default();
    let factory = loader
        .resolve_from(&counted_library(create_mismatched::<3>), "libcounted.so")
        .unwrap();

    let err = loader.create(&factory).unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::AbiVersionMismatch);
    assert_eq!(
        err,
        LoaderError::AbiVersionMismatch {
            path: "libcounted.so".into(),
            expected: 0,
            found: 99,
        }
    );
    assert_eq!(destroys(3), 1);
}

#[test]
fn test_malformed_instances_rejected_and_destroyed() {
    let loader = Loader::default();

    let factory = loader
        .resolve_from(&counted_library(create_without_execute::<4>), "libcounted.so")
        .unwrap();
    let err = loader.create(&factory).unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::VmCreationFailure);
    assert!(err.to_string().contains("execute"));
    assert_eq!(destroys(4), 1);

    let factory = loader
        .resolve_from(&counted_library(create_unnamed::<5>), "libcounted.so")
        .unwrap();
    let err = loader.create(&factory).unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::VmCreationFailure);
    assert_eq!(destroys(5), 1);
}

#[test]
fn test_null_factory_result() {
    let loader = Loader::default();
    let factory = loader.resolve_from(&counted_library(create_null), "libcounted.so").unwrap();
    let err = loader.create(&factory).unwrap_err();
    assert!(matches!(err, LoaderError::VmCreationFailure { .. }));
    assert!(err.to_string().contains("returned null"));
}

#[test]
fn test_expected_abi_version_is_configurable() {
    let loader = Loader::new(vmlink_loader::LoaderConfig {
        expected_abi_version: 99,
        ..Default::default()
    });
    let factory = loader
        .resolve_from(&counted_library(create_mismatched::<6>), "libcounted.so")
        .unwrap();
    let vm = loader.create(&factory).unwrap();
    assert_eq!(vm.abi_version(), 99);
    drop(vm);
    assert_eq!(destroys(6), 1);
}

// ── Test: configuration ──

#[test]
fn test_unknown_option_destroys_instance_once() {
    init_logging();
    let loader = Loader::default();
    let config = VmConfig::parse("./vm.so,bogus_option").unwrap();
    let source = StaticLibrary::new().with_symbol("vmlink_create_vm", create_counted::<7>);
    let factory = loader.resolve_from(&source, &config.path).unwrap();
    assert_eq!(factory.symbol(), "vmlink_create_vm");

    let vm = loader.create(&factory).unwrap();
    let err = loader.configure(vm, &config.options).unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::InvalidOptionName);
    assert_eq!(
        err,
        LoaderError::InvalidOptionName {
            vm: "counted_vm".into(),
            name: "bogus_option".into(),
        }
    );
    assert_eq!(destroys(7), 1);
    assert_eq!(
        vmlink_loader::last_error_message().as_deref(),
        Some("counted_vm: unknown option 'bogus_option'")
    );
}

#[test]
fn test_invalid_value_stops_at_first_rejection() {
    let loader = Loader::default();
    let source = counted_library(create_counted::<8>);
    let factory = loader.resolve_from(&source, "libcounted.so").unwrap();
    let vm = loader.create(&factory).unwrap();

    let options = [
        VmOption::new("mode", "slow"),
        VmOption::new("mode", "warp"),
        VmOption::new("bogus", ""),
    ];
    let err = loader.configure(vm, &options).unwrap_err();
    assert_eq!(err.code(), LoaderErrorCode::InvalidOptionValue);
    assert_eq!(
        err.to_string(),
        "counted_vm: unsupported value 'warp' for option 'mode'"
    );
    assert_eq!(destroys(8), 1);
}

#[test]
fn test_options_applied_in_order() {
    let loader = Loader::default();
    let factory = loader.resolve_from(&counted_library(create_counted::<9>), "libcounted.so").unwrap();
    let vm = loader.create(&factory).unwrap();
    let config = VmConfig::parse("libcounted.so,mode=slow,mode=fast,mode=slow").unwrap();
    let vm = loader.configure(vm, &config.options).unwrap();

    let mut host = MemHost::new();
    let msg = Message::call(Address::default(), Address::new([1; 24]), 50, &[]);
    let result = vm.execute(&mut host, Revision::Frontier, &msg, &[0x00]);
    assert_eq!(result.status_code(), StatusCode::Success);
    assert_eq!(result.output(), b"slow");
    assert_eq!(result.gas_left(), 50);

    drop(result);
    drop(vm);
    assert_eq!(destroys(9), 1);
}

#[test]
fn test_not_configurable_rejects_every_name() {
    let loader = Loader::default();
    let source = StaticLibrary::new().with_symbol("vmlink_create", create_precompile);
    let factory = loader.resolve_from(&source, "precompiles.so").unwrap();
    let mut vm = loader.create(&factory).unwrap();
    assert_eq!(
        vm.set_option("anything", ""),
        Err(vmlink_primitives::SetOptionError::InvalidName)
    );
}

// ── Test: raw ownership ──

#[test]
fn test_into_raw_hands_over_destruction() {
    let loader = Loader::default();
    let factory = loader.resolve_from(&counted_library(create_counted::<10>), "libcounted.so").unwrap();
    let vm = loader.create(&factory).unwrap();

    let raw = vm.into_raw();
    assert_eq!(destroys(10), 0);
    unsafe {
        let destroy = (*raw).destroy.unwrap();
        destroy(raw);
    }
    assert_eq!(destroys(10), 1);
}

// ── Test: precompiles ──

#[test]
fn test_precompile_runs_without_host() {
    let loader = Loader::default();
    let source = StaticLibrary::new().with_symbol("vmlink_create", create_precompile);
    let vm = loader
        .resolve_from(&source, "precompiles.so")
        .and_then(|factory| loader.create(&factory))
        .unwrap();
    assert!(vm.has_capability(Capability::Precompiles));

    let msg = Message::call(Address::default(), Address::default(), 100, &[1, 2, 3]);
    let result = vm.execute_precompile(Revision::Frontier, &msg, &[]);
    assert_eq!(result.status_code(), StatusCode::Success);
    assert_eq!(result.gas_left(), 90);
    assert_eq!(result.output(), &[2, 4, 6]);
}

#[test]
fn test_precompile_call_rejected_for_bytecode_backend() {
    let loader = Loader::default();
    let factory = loader.resolve_from(&counted_library(create_counted::<11>), "libcounted.so").unwrap();
    let vm = loader.create(&factory).unwrap();
    let msg = Message::call(Address::default(), Address::default(), 100, &[]);
    let result = vm.execute_precompile(Revision::Frontier, &msg, &[]);
    assert_eq!(result.status_code(), StatusCode::Rejected);
    assert_eq!(result.gas_left(), 0);
}
