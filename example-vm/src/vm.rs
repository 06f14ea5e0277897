//! `ExampleVm` — a counting echo backend.

use core::ffi::CStr;

use log::{debug, info};
use vmlink_primitives::{
    Bytes32, Capability, CapabilitySet, ExecutionResult, Message, Revision, SetOptionError,
    StatusCode,
};
use vmlink_vm::{ExecutionContext, VmBackend};

/// Flat cost of every execution.
pub const BASE_GAS: i64 = 100;

pub const DEFAULT_GAS_PER_BYTE: u32 = 3;

/// Code starting with this byte reverts.
pub const REVERT_MARKER: u8 = 0xFD;

/// Storage key of the per-recipient call counter.
const COUNTER_KEY: Bytes32 = Bytes32::new([0u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleVm {
    gas_per_byte: u32,
    trace: bool,
}

impl ExampleVm {
    pub fn gas_per_byte(&self) -> u32 {
        self.gas_per_byte
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Gas charged for an input of `len` bytes, or `None` on overflow.
    pub fn cost(&self, len: usize) -> Option<i64> {
        let len = i64::try_from(len).ok()?;
        len.checked_mul(i64::from(self.gas_per_byte))?
            .checked_add(BASE_GAS)
    }
}

impl Default for ExampleVm {
    fn default() -> Self {
        Self {
            gas_per_byte: DEFAULT_GAS_PER_BYTE,
            trace: false,
        }
    }
}

fn counter_value(value: &Bytes32) -> u64 {
    let mut low = [0u8; 8];
    low.copy_from_slice(&value.bytes[24..]);
    u64::from_be_bytes(low)
}

impl VmBackend for ExampleVm {
    const NAME: &'static CStr = c"example_vm";
    const VERSION: &'static CStr =
        match CStr::from_bytes_with_nul(concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes()) {
            Ok(version) => version,
            Err(_) => panic!("package version contains a NUL byte"),
        };

    fn init() -> Self {
        Self::default()
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from(Capability::Bytecode)
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), SetOptionError> {
        match name {
            "gas-per-byte" => {
                self.gas_per_byte = value.parse().map_err(|_| SetOptionError::InvalidValue)?;
            }
            "trace" => {
                self.trace = match value {
                    "" | "on" => true,
                    "off" => false,
                    _ => return Err(SetOptionError::InvalidValue),
                };
            }
            _ => return Err(SetOptionError::InvalidName),
        }
        debug!("example_vm: {}={:?}", name, value);
        Ok(())
    }

    fn execute(
        &self,
        revision: Revision,
        code: &[u8],
        message: &Message<'_>,
        context: Option<&mut ExecutionContext<'_>>,
    ) -> ExecutionResult {
        let cost = match self.cost(message.input.len()) {
            Some(cost) if cost <= message.gas => cost,
            _ => return ExecutionResult::error(StatusCode::OutOfGas),
        };
        let gas_left = message.gas - cost;
        if self.trace {
            info!(
                "example_vm: {} depth={} input={} bytes cost={}",
                revision,
                message.depth,
                message.input.len(),
                cost
            );
        }

        if code.first() == Some(&REVERT_MARKER) {
            return ExecutionResult::revert(gas_left, message.input);
        }

        if let Some(ctx) = context {
            let count = counter_value(&ctx.get_storage(&message.recipient, &COUNTER_KEY));
            let next = Bytes32::from(count.wrapping_add(1));
            let status = ctx.set_storage(&message.recipient, &COUNTER_KEY, &next);
            if self.trace {
                info!("example_vm: counter {} -> {} ({})", count, count.wrapping_add(1), status);
            }
        }

        ExecutionResult::success(gas_left, message.input)
    }
}
