//! Factory symbol naming convention.
//!
//! The loader guesses the factory name from the library file name:
//!
//! 1. take the final path component: `libexample-interpreter.so.1.0`
//! 2. strip one leading `lib` and every extension: `example-interpreter`
//! 3. replace `-` with `_` to get the base name: `example_interpreter`
//! 4. try `vmlink_create_example_interpreter`, then the bare `vmlink_create`

use vmlink_primitives::SYMBOL_PREFIX;

/// The base name derived from a library path. May be empty.
pub fn base_name(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let name = file_name.strip_prefix("lib").unwrap_or(file_name);
    let name = match name.find('.') {
        Some(pos) => &name[..pos],
        None => name,
    };
    name.replace('-', "_")
}

/// `vmlink_create_<base_name>`.
pub fn create_symbol(base_name: &str) -> String {
    format!("{}_create_{}", SYMBOL_PREFIX, base_name)
}

/// The bare `vmlink_create` symbol tried last.
pub fn fallback_symbol() -> String {
    format!("{}_create", SYMBOL_PREFIX)
}

/// Symbols to look up for `path`, in order.
pub fn candidate_symbols(path: &str) -> Vec<String> {
    let base = base_name(path);
    if base.is_empty() {
        vec![fallback_symbol()]
    } else {
        vec![create_symbol(&base), fallback_symbol()]
    }
}
