//! Error and outcome codes shared by the loader, hosts and backends.
//!
//! The repr values are part of the binary contract.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Loader error codes, as reported through the C-callable loader surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LoaderErrorCode {
    Success = 0,
    CannotOpen = 1,
    SymbolNotFound = 2,
    InvalidArgument = 3,
    VmCreationFailure = 4,
    AbiVersionMismatch = 5,
    InvalidOptionName = 6,
    InvalidOptionValue = 7,
    /// Never produced by the loader; used to initialize out-parameters.
    Unspecified = -1,
}

impl LoaderErrorCode {
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::CannotOpen),
            2 => Some(Self::SymbolNotFound),
            3 => Some(Self::InvalidArgument),
            4 => Some(Self::VmCreationFailure),
            5 => Some(Self::AbiVersionMismatch),
            6 => Some(Self::InvalidOptionName),
            7 => Some(Self::InvalidOptionValue),
            -1 => Some(Self::Unspecified),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for LoaderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::CannotOpen => write!(f, "CANNOT_OPEN"),
            Self::SymbolNotFound => write!(f, "SYMBOL_NOT_FOUND"),
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::VmCreationFailure => write!(f, "VM_CREATION_FAILURE"),
            Self::AbiVersionMismatch => write!(f, "ABI_VERSION_MISMATCH"),
            Self::InvalidOptionName => write!(f, "INVALID_OPTION_NAME"),
            Self::InvalidOptionValue => write!(f, "INVALID_OPTION_VALUE"),
            Self::Unspecified => write!(f, "UNSPECIFIED_ERROR"),
        }
    }
}

/// Raw outcome of a set-option call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SetOptionResult {
    Success = 0,
    InvalidName = 1,
    InvalidValue = 2,
}

impl SetOptionResult {
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::InvalidName),
            2 => Some(Self::InvalidValue),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// A rejected set-option call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetOptionError {
    #[error("unknown option name")]
    InvalidName,
    #[error("unsupported option value")]
    InvalidValue,
}

impl From<SetOptionError> for SetOptionResult {
    fn from(err: SetOptionError) -> Self {
        match err {
            SetOptionError::InvalidName => Self::InvalidName,
            SetOptionError::InvalidValue => Self::InvalidValue,
        }
    }
}

impl SetOptionResult {
    /// Interpret a raw code. Unknown codes are treated as a rejected value.
    pub fn into_result(self) -> Result<(), SetOptionError> {
        match self {
            Self::Success => Ok(()),
            Self::InvalidName => Err(SetOptionError::InvalidName),
            Self::InvalidValue => Err(SetOptionError::InvalidValue),
        }
    }
}

/// A malformed message received across the boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("unknown call kind {0}")]
    InvalidCallKind(i32),
    #[error("input pointer is null but input size is {0}")]
    NullInput(usize),
}
