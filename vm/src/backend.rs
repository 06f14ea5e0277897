//! The trait a VM backend implements to be exported through the C ABI.

use core::ffi::CStr;

use vmlink_primitives::{CapabilitySet, ExecutionResult, Message, Revision, SetOptionError};

use crate::context::ExecutionContext;

/// A VM backend.
///
/// [`crate::VmContainer`] turns an implementation into a `vmlink_vm`
/// instance; [`crate::declare_vm!`] exports the factory for it.
///
/// Instances may be created on one thread and used or destroyed on another,
/// so backends must be `Send`.
pub trait VmBackend: Sized + Send {
    /// Backend name reported in the instance header. Must be non-empty.
    const NAME: &'static CStr;

    /// Backend version reported in the instance header. Must be non-empty.
    const VERSION: &'static CStr;

    /// Whether the instance exposes the set-option operation. When false the
    /// slot is left null and every option is rejected as an unknown name.
    const CONFIGURABLE: bool = true;

    /// Called once when the factory creates an instance.
    fn init() -> Self;

    /// Capabilities may change after `set_option`.
    fn capabilities(&self) -> CapabilitySet;

    /// Called once per configuration option, in declaration order.
    fn set_option(&mut self, _name: &str, _value: &str) -> Result<(), SetOptionError> {
        Err(SetOptionError::InvalidName)
    }

    /// Execute `code` for `message`.
    ///
    /// `context` is `None` only when the host passed no callback table, which
    /// the container allows for backends advertising `Precompiles`.
    fn execute(
        &self,
        revision: Revision,
        code: &[u8],
        message: &Message<'_>,
        context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult;
}
