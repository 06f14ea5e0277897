//! Execution status codes.
//!
//! Codes partition into three bands: `0` is success, positive values are
//! defined execution failures, negative values are backend-internal errors.
//! The repr values are part of the binary contract and MUST NOT change.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The outcome of one execution, carried inline in every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum StatusCode {
    Success = 0,
    Failure = 1,
    /// Execution reverted. Gas left and output MAY be non-zero.
    Revert = 2,
    OutOfGas = 3,
    InvalidInstruction = 4,
    UndefinedInstruction = 5,
    StackOverflow = 6,
    StackUnderflow = 7,
    BadJumpDestination = 8,
    InvalidMemoryAccess = 9,
    CallDepthExceeded = 10,
    StaticModeViolation = 11,
    PrecompileFailure = 12,
    ContractValidationFailure = 13,
    ArgumentOutOfRange = 14,
    UnreachableInstruction = 15,
    Trap = 16,
    InsufficientBalance = 17,
    InsufficientInput = 18,
    InvalidSyscallArgument = 19,

    /// Generic backend-internal error.
    InternalError = -1,
    /// The backend refuses this code or message; the host may try another backend.
    Rejected = -2,
    OutOfMemory = -3,
}

impl StatusCode {
    /// Convert from a raw code. Returns `None` for values this ABI does not define.
    pub fn from_i32(code: i32) -> Option<Self> {
        let status = match code {
            0 => Self::Success,
            1 => Self::Failure,
            2 => Self::Revert,
            3 => Self::OutOfGas,
            4 => Self::InvalidInstruction,
            5 => Self::UndefinedInstruction,
            6 => Self::StackOverflow,
            7 => Self::StackUnderflow,
            8 => Self::BadJumpDestination,
            9 => Self::InvalidMemoryAccess,
            10 => Self::CallDepthExceeded,
            11 => Self::StaticModeViolation,
            12 => Self::PrecompileFailure,
            13 => Self::ContractValidationFailure,
            14 => Self::ArgumentOutOfRange,
            15 => Self::UnreachableInstruction,
            16 => Self::Trap,
            17 => Self::InsufficientBalance,
            18 => Self::InsufficientInput,
            19 => Self::InvalidSyscallArgument,
            -1 => Self::InternalError,
            -2 => Self::Rejected,
            -3 => Self::OutOfMemory,
            _ => return None,
        };
        Some(status)
    }

    /// Convert from a raw code produced by a foreign backend.
    ///
    /// Backends may return implementation-specific codes. Unknown negative
    /// codes become `InternalError`, unknown positive codes `Failure`.
    pub fn from_raw_lossy(code: i32) -> Self {
        match Self::from_i32(code) {
            Some(status) => status,
            None if code < 0 => Self::InternalError,
            None => Self::Failure,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Negative band: never a normal execution outcome.
    pub fn is_internal_error(self) -> bool {
        self.as_i32() < 0
    }

    /// Only success and revert may report non-zero gas left.
    pub fn retains_gas(self) -> bool {
        matches!(self, Self::Success | Self::Revert)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Revert => "revert",
            Self::OutOfGas => "out of gas",
            Self::InvalidInstruction => "invalid instruction",
            Self::UndefinedInstruction => "undefined instruction",
            Self::StackOverflow => "stack overflow",
            Self::StackUnderflow => "stack underflow",
            Self::BadJumpDestination => "bad jump destination",
            Self::InvalidMemoryAccess => "invalid memory access",
            Self::CallDepthExceeded => "call depth exceeded",
            Self::StaticModeViolation => "static mode violation",
            Self::PrecompileFailure => "precompile failure",
            Self::ContractValidationFailure => "contract validation failure",
            Self::ArgumentOutOfRange => "argument out of range",
            Self::UnreachableInstruction => "unreachable instruction",
            Self::Trap => "trap",
            Self::InsufficientBalance => "insufficient balance",
            Self::InsufficientInput => "insufficient input",
            Self::InvalidSyscallArgument => "invalid syscall argument",
            Self::InternalError => "internal error",
            Self::Rejected => "rejected",
            Self::OutOfMemory => "out of memory",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_values() {
        assert_eq!(StatusCode::Success as i32, 0);
        assert_eq!(StatusCode::Failure as i32, 1);
        assert_eq!(StatusCode::Revert as i32, 2);
        assert_eq!(StatusCode::OutOfGas as i32, 3);
        assert_eq!(StatusCode::InsufficientBalance as i32, 17);
        assert_eq!(StatusCode::InvalidSyscallArgument as i32, 19);
        assert_eq!(StatusCode::InternalError as i32, -1);
        assert_eq!(StatusCode::Rejected as i32, -2);
        assert_eq!(StatusCode::OutOfMemory as i32, -3);
    }

    #[test]
    fn test_from_i32_roundtrip() {
        for code in -3..=19 {
            let status = StatusCode::from_i32(code).unwrap();
            assert_eq!(status.as_i32(), code);
        }
        assert_eq!(StatusCode::from_i32(20), None);
        assert_eq!(StatusCode::from_i32(-4), None);
    }

    #[test]
    fn test_lossy_bands() {
        assert_eq!(StatusCode::from_raw_lossy(-99), StatusCode::InternalError);
        assert_eq!(StatusCode::from_raw_lossy(1000), StatusCode::Failure);
        assert_eq!(StatusCode::from_raw_lossy(-2), StatusCode::Rejected);
    }

    #[test]
    fn test_bands() {
        assert!(StatusCode::Success.is_success());
        assert!(!StatusCode::Revert.is_success());
        assert!(StatusCode::Rejected.is_internal_error());
        assert!(!StatusCode::Trap.is_internal_error());
        assert!(StatusCode::Revert.retains_gas());
        assert!(!StatusCode::OutOfGas.retains_gas());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::OutOfGas.to_string(), "out of gas");
        assert_eq!(StatusCode::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_serde_json() {
        for status in [StatusCode::Success, StatusCode::OutOfGas, StatusCode::OutOfMemory] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(serde_json::from_str::<StatusCode>(&json).unwrap(), status);
        }
        assert_eq!(serde_json::to_string(&StatusCode::Revert).unwrap(), r#""Revert""#);
        assert!(serde_json::from_str::<StatusCode>(r#""Exploded""#).is_err());
    }
}
