use std::fs;
use std::path::PathBuf;

/// File extension appended to module names by the default loader.
pub(crate) const MODULE_EXTENSION: &str = "wren";

pub(crate) fn module_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{name}.{MODULE_EXTENSION}"))
}

/// Reads `<name>.wren` relative to the working directory.
pub(crate) fn read_module_file(name: &str) -> Option<String> {
    let path = module_path(name);
    match fs::read_to_string(&path) {
        Ok(source) => {
            log::debug!("loaded module '{name}' from {}", path.display());
            Some(source)
        }
        Err(err) => {
            log::debug!("module '{name}' not loaded from {}: {err}", path.display());
            None
        }
    }
}

/// Number of arguments a call signature takes.
///
/// Only placeholders inside a trailing `(...)` parameter list or a leading
/// `[...]` subscript count; underscores in the method name do not.
pub(crate) fn signature_arity(signature: &str) -> usize {
    let placeholders = |part: &str| part.bytes().filter(|&b| b == b'_').count();

    let params = signature
        .strip_suffix(')')
        .and_then(|rest| rest.rfind('(').map(|open| &rest[open + 1..]))
        .map_or(0, placeholders);
    let subscript = signature
        .strip_prefix('[')
        .map(|rest| rest.find(']').map_or(rest, |close| &rest[..close]))
        .map_or(0, placeholders);

    params + subscript
}
