use std::path::{Path, PathBuf};

/// Canvas roots every course's folder tree at this segment.
pub const ROOT_SEGMENT: &str = "course files";

/// Strip the `course files` root from a folder's `full_name`, giving a path
/// relative to the course directory. The separator after the root is kept,
/// so `course files/Unit1` becomes `/Unit1`; the root itself becomes `/`.
///
/// The strip is by length, not by match, so any raw path of at most
/// [`ROOT_SEGMENT`] characters maps to `/`.
pub fn relative_path(raw_path: &str) -> String {
    let root_len = ROOT_SEGMENT.chars().count();
    if raw_path.chars().count() <= root_len {
        return "/".to_string();
    }
    raw_path.chars().skip(root_len).collect()
}

/// Course codes like `CS/EE 101` would otherwise create a nested directory.
pub fn sanitize_container_code(code: &str) -> String {
    code.chars().filter(|c| *c != '/').collect()
}

/// Directory name for a course: the sanitized code, or the course id when
/// the code sanitizes to nothing usable. Every course gets its own directory
/// below `root`, so no course file can land next to the sync log.
pub fn container_directory_name(code: &str, id: u64) -> String {
    let sanitized = sanitize_container_code(code);
    if is_unusable_component(sanitized.trim()) {
        id.to_string()
    } else {
        sanitized
    }
}

fn is_unusable_component(name: &str) -> bool {
    name.is_empty() || name == "." || name == ".."
}

/// Local directory for a folder: `root / course_dir / relative...`.
///
/// `relative_path` is split on `/` and pushed component by component;
/// empty, `.` and `..` components are dropped so a hostile folder name can
/// never escape `root`.
pub fn local_directory(root: &Path, course_dir: &str, relative_path: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    if !is_unusable_component(course_dir) {
        path.push(course_dir);
    }
    for component in relative_path.split('/') {
        if is_unusable_component(component) {
            continue;
        }
        path.push(component);
    }
    path
}

/// Remove characters that are invalid on common filesystems:
/// `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// On-disk file name for an item. Falls back to the item id when the
/// display name cleans down to nothing usable.
pub fn item_file_name(display_name: &str, id: u64) -> String {
    let clean = clean_filename(display_name);
    if is_unusable_component(clean.trim()) {
        id.to_string()
    } else {
        clean
    }
}
