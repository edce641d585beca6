//! Lexical path helpers shared by hosts and plugins.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding segment. The filesystem is never consulted.
pub fn clean(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                result.push(component.as_os_str());
                depth = 0;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    result.pop();
                    depth -= 1;
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            Component::Normal(part) => {
                result.push(part);
                depth += 1;
            }
        }
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// Make `path` absolute against `base` and clean it.
pub fn absolutize(path: &str, base: &Path) -> String {
    let path = Path::new(path);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    clean(&joined).to_string_lossy().into_owned()
}

/// Express `path` relative to `base`, climbing with `..` where needed.
///
/// Both paths are cleaned first. Returns `None` when `path` is not
/// absolute or the two live under different roots.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    let path = clean(path);
    let base = clean(base);
    if !path.is_absolute() || !base.is_absolute() {
        return None;
    }

    let mut path_parts = path.components().peekable();
    let mut base_parts = base.components().peekable();
    match (path_parts.peek(), base_parts.peek()) {
        (Some(a), Some(b)) if a == b => {}
        _ => return None,
    }
    while let (Some(a), Some(b)) = (path_parts.peek(), base_parts.peek()) {
        if a != b {
            break;
        }
        path_parts.next();
        base_parts.next();
    }

    let mut relative: PathBuf = base_parts.map(|_| Component::ParentDir).collect();
    relative.extend(path_parts);
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

/// Replace Windows separators with forward slashes.
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean(Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn test_absolutize_keeps_query() {
        assert_eq!(
            absolutize("./App.vue?type=script", Path::new("/src/components")),
            "/src/components/App.vue?type=script"
        );
        assert_eq!(absolutize("/abs/App.vue", Path::new("/ignored")), "/abs/App.vue");
    }

    #[test]
    fn test_relative_to() {
        let base = Path::new("/work/app");
        assert_eq!(
            relative_to(Path::new("/work/app/src/App.vue"), base),
            Some(PathBuf::from("src/App.vue"))
        );
        assert_eq!(
            relative_to(Path::new("/work/lib/Button.vue"), base),
            Some(PathBuf::from("../lib/Button.vue"))
        );
        assert_eq!(
            relative_to(Path::new("/work/app/./src/../App.vue"), Path::new("/work/app/")),
            Some(PathBuf::from("App.vue"))
        );
        assert_eq!(relative_to(base, base), Some(PathBuf::from(".")));
        assert_eq!(relative_to(Path::new("src/App.vue"), base), None);
    }

    #[test]
    fn test_to_posix() {
        assert_eq!(to_posix(r"C:\Users\test\file.vue"), "C:/Users/test/file.vue");
        assert_eq!(to_posix(r"\\server\share\file.vue"), "//server/share/file.vue");
        assert_eq!(to_posix("normal/path.vue"), "normal/path.vue");
        assert_eq!(to_posix(""), "");
    }
}
