//! Loader configuration.

use serde::{Deserialize, Serialize};
use vmlink_primitives::ABI_VERSION;

/// Maximum accepted length of a library path or configuration string.
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Configuration for the library loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Paths (and configuration strings) longer than this are rejected.
    pub max_path_len: usize,

    /// Open libraries with `RTLD_GLOBAL` on Unix, so their symbols are
    /// visible to libraries loaded later.
    pub global_symbols: bool,

    /// Instances reporting any other ABI version are rejected.
    pub expected_abi_version: i32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
            global_symbols: true,
            expected_abi_version: ABI_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();
        assert_eq!(config.max_path_len, 4096);
        assert!(config.global_symbols);
        assert_eq!(config.expected_abi_version, ABI_VERSION);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{ "global_symbols": false }"#).unwrap();
        assert!(!config.global_symbols);
        assert_eq!(config.max_path_len, DEFAULT_MAX_PATH_LEN);
    }
}
