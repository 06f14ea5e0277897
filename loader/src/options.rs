//! VM configuration strings.
//!
//! ```text
//! config := path ("," option)*
//! option := name ["=" value]
//! ```
//!
//! An option without `=value` has the empty value. Names and values cannot
//! contain `,` or `=`; there is no escaping. Declaration order is preserved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_PATH_LEN;
use crate::error::LoaderError;

/// One `name[=value]` option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmOption {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl VmOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A library path plus the options to apply after creating the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    pub path: String,
    #[serde(default)]
    pub options: Vec<VmOption>,
}

impl VmConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(VmOption::new(name, value));
        self
    }

    /// Parse a configuration string with the default length limit.
    pub fn parse(config: &str) -> Result<Self, LoaderError> {
        Self::parse_with_limit(config, DEFAULT_MAX_PATH_LEN)
    }

    /// Parse a configuration string no longer than `max_len` bytes.
    pub fn parse_with_limit(config: &str, max_len: usize) -> Result<Self, LoaderError> {
        if config.len() > max_len {
            return Err(LoaderError::InvalidArgument(format!(
                "configuration longer than {} bytes",
                max_len
            )));
        }
        if config.trim().is_empty() {
            return Err(LoaderError::InvalidArgument("empty configuration".into()));
        }

        let mut parts = config.split(',');
        let path = parts.next().unwrap_or_default().trim();
        if path.is_empty() {
            return Err(LoaderError::InvalidArgument(format!(
                "empty path in configuration '{}'",
                config
            )));
        }

        let options = parts.map(parse_option).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            path: path.to_string(),
            options,
        })
    }
}

fn parse_option(option: &str) -> Result<VmOption, LoaderError> {
    let (name, value) = option.split_once('=').unwrap_or((option, ""));
    let name = name.trim();
    if name.is_empty() {
        return Err(LoaderError::InvalidArgument(format!(
            "empty option name in '{}'",
            option
        )));
    }
    if value.contains('=') {
        return Err(LoaderError::InvalidArgument(format!(
            "option '{}' has more than one '='",
            name
        )));
    }
    Ok(VmOption::new(name, value.trim()))
}

impl FromStr for VmConfig {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats back to the configuration-string syntax.
impl fmt::Display for VmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for option in &self.options {
            if option.value.is_empty() {
                write!(f, ",{}", option.name)?;
            } else {
                write!(f, ",{}={}", option.name, option.value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_in_order() {
        let config = VmConfig::parse("./vm.so,engine=compiler,trace,verbosity=2").unwrap();
        assert_eq!(config.path, "./vm.so");
        assert_eq!(
            config.options,
            vec![
                VmOption::new("engine", "compiler"),
                VmOption::new("trace", ""),
                VmOption::new("verbosity", "2"),
            ]
        );
    }

    #[test]
    fn test_path_only() {
        let config: VmConfig = "  /opt/libvm.so ".parse().unwrap();
        assert_eq!(config.path, "/opt/libvm.so");
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_empty_value_and_duplicates_kept() {
        let config = VmConfig::parse("vm.so,a=,a=2, b = x ").unwrap();
        assert_eq!(
            config.options,
            vec![VmOption::new("a", ""), VmOption::new("a", "2"), VmOption::new("b", "x")]
        );
    }

    #[test]
    fn test_invalid_arguments() {
        for bad in ["", "   ", ",trace", " ,a=b", "vm.so,", "vm.so,,a", "vm.so,=1", "vm.so,a=b=c"] {
            let err = VmConfig::parse(bad).unwrap_err();
            assert!(
                matches!(err, LoaderError::InvalidArgument(_)),
                "'{}' gave {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_length_limit() {
        let long = format!("{},a", "x".repeat(20));
        assert!(VmConfig::parse_with_limit(&long, 10).is_err());
        assert!(VmConfig::parse_with_limit(&long, 64).is_ok());
    }

    #[test]
    fn test_display_round_trips() {
        let text = "./vm.so,engine=compiler,trace,verbosity=2";
        assert_eq!(VmConfig::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_serde_form() {
        let config: VmConfig = serde_json::from_str(
            r#"{ "path": "./libexample_vm.so", "options": [{ "name": "trace" }] }"#,
        )
        .unwrap();
        assert_eq!(config, VmConfig::new("./libexample_vm.so").with_option("trace", ""));
    }
}
