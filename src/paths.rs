pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";
pub const SECRET_SUFFIX: &str = ".gpg";

pub fn resolve_parent_dir(path: &str) -> String {
    let parts: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
    if parts.len() <= 1 {
        return ROOT.to_string();
    }
    format!("/{}/", parts[..parts.len() - 1].join("/"))
}

pub fn format_entry_label(name: &str, is_dir: bool) -> String {
    if is_dir {
        format!("{name}/")
    } else {
        name.strip_suffix(SECRET_SUFFIX).unwrap_or(name).to_string()
    }
}

pub fn sanitize_route(path: &str) -> String {
    let route = path.strip_prefix(SEPARATOR).unwrap_or(path);
    route.strip_suffix(SECRET_SUFFIX).unwrap_or(route).to_string()
}

pub fn is_safe_segment(name: &str) -> bool {
    if cfg!(windows) && name.contains('\\') {
        return false;
    }
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(SEPARATOR)
        && !name.contains('\0')
}

pub fn has_traversal_segment(path: &str) -> bool {
    path.split(SEPARATOR).any(|s| s == ".." || s == ".")
}
