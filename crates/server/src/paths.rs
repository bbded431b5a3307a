//! Path string helpers for routing and target computation
//!
//! Event paths may arrive with either separator; everything that is
//! compared or sent to a media server is normalized to forward slashes.

/// Normalize a path string: forward slashes, no empty or `.` components,
/// no trailing separator, leading slash preserved.
pub fn normalize(path: &str) -> String {
    let parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let joined = parts.join("/");
    if path.starts_with('/') || path.starts_with('\\') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Parent directory of a path, forward-slashed
pub fn parent_dir(path: &str) -> String {
    let absolute = path.starts_with('/') || path.starts_with('\\');
    let mut parts: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    parts.pop();
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Lower-cased extension of the final path component, including the
/// leading dot; empty for directories, dotfiles and extensionless names.
pub fn extension_of(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or("");
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_lowercase(),
        _ => String::new(),
    }
}
