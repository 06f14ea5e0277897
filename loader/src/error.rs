//! Loader error types.

use vmlink_primitives::LoaderErrorCode;

/// Top-level error type for the loader crate.
///
/// Every variant maps to one [`LoaderErrorCode`]; the `Display` text is
/// the diagnostic reported through `last_error_message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// The path is empty or too long, or the library failed to load.
    #[error("{path}: cannot load library: {reason}")]
    CannotOpen { path: String, reason: String },

    /// Neither the named nor the bare factory symbol exists.
    #[error("{path}: VM create function not found (tried {})", .tried.join(", "))]
    SymbolNotFound { path: String, tried: Vec<String> },

    /// Malformed configuration string or argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The factory returned null or a malformed instance.
    #[error("{path}: creating VM instance failed: {reason}")]
    VmCreationFailure { path: String, reason: String },

    #[error("{path}: VM ABI version {found} instead of {expected}")]
    AbiVersionMismatch {
        path: String,
        expected: i32,
        found: i32,
    },

    #[error("{vm}: unknown option '{name}'")]
    InvalidOptionName { vm: String, name: String },

    #[error("{vm}: unsupported value '{value}' for option '{name}'")]
    InvalidOptionValue {
        vm: String,
        name: String,
        value: String,
    },
}

impl LoaderError {
    /// The numeric code reported through the C-callable surface.
    pub fn code(&self) -> LoaderErrorCode {
        match self {
            Self::CannotOpen { .. } => LoaderErrorCode::CannotOpen,
            Self::SymbolNotFound { .. } => LoaderErrorCode::SymbolNotFound,
            Self::InvalidArgument(_) => LoaderErrorCode::InvalidArgument,
            Self::VmCreationFailure { .. } => LoaderErrorCode::VmCreationFailure,
            Self::AbiVersionMismatch { .. } => LoaderErrorCode::AbiVersionMismatch,
            Self::InvalidOptionName { .. } => LoaderErrorCode::InvalidOptionName,
            Self::InvalidOptionValue { .. } => LoaderErrorCode::InvalidOptionValue,
        }
    }
}
