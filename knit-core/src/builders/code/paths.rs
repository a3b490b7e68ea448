//! Path arithmetic on `/`-separated source paths.
//!
//! Paths here are index keys, not filesystem paths: nothing touches the disk
//! and no canonicalization happens beyond separator normalization.

/// Replace backslashes with forward slashes.
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Drop the extension of the last path component.
///
/// Leading dots of the file name do not start an extension, so `.env` and
/// `dir/.hidden` are returned unchanged.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) if name[..dot].chars().any(|c| c != '.') => &path[..name_start + dot],
        _ => path,
    }
}

/// Directory part of `path`; empty for a bare file name.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => path[..idx].trim_end_matches('/'),
        None => "",
    }
}

/// Join two path fragments with a single `/`.
pub fn join(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => dir.to_string(),
        (false, false) if dir.ends_with('/') => format!("{}{}", dir, rest),
        (false, false) => format!("{}/{}", dir, rest),
    }
}

/// Dotted module name as a relative path (`a.b.c` -> `a/b/c`).
pub fn module_to_path(module: &str) -> String {
    module.replace('.', "/")
}

/// Candidate key for a relative import: start from `current_dir`, ascend
/// `level - 1` parents, then descend into `module`.
pub fn relative_base(current_dir: &str, level: u64, module: &str) -> String {
    let mut dir = current_dir;
    for _ in 1..level {
        let parent = parent_dir(dir);
        if parent == dir {
            break;
        }
        dir = parent;
    }
    join(dir, &module_to_path(module))
}

/// Key of a package's initializer module.
pub fn init_of(path: &str) -> String {
    join(path, "__init__")
}
