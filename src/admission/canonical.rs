//! Path canonicalization and containment checks shared by the path and
//! command authorizers.
//!
//! Every path that is compared against a configured root goes through
//! [`canonicalize`] first. Containment is decided component by component,
//! never by string prefix, so a root of `/home/user` does not cover
//! `/home/user2`.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against `base` and collapse `.` and `..` segments
/// without touching the filesystem.
///
/// A `..` that would climb above the root stays at the root, matching how the
/// kernel treats `/..`.
pub fn clean(path: &Path, base: &Path) -> PathBuf {
    let joined;
    let path = if path.is_absolute() {
        path
    } else {
        joined = base.join(path);
        joined.as_path()
    };

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to remove the root, which is what we want
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

/// Resolve `path` to the form that is compared against configured roots.
///
/// The path is cleaned lexically first, then symlinks are resolved. When the
/// path does not exist yet (a file about to be written), the deepest existing
/// ancestor is resolved and the remaining cleaned segments are appended, so a
/// symlinked parent directory cannot smuggle a new file outside its root.
///
/// Errors other than "not found" are returned unchanged.
pub fn canonicalize(path: &Path, base: &Path) -> io::Result<PathBuf> {
    let cleaned = clean(path, base);

    match std::fs::canonicalize(&cleaned) {
        Ok(real) => return Ok(real),
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        Err(_) => {}
    }

    for ancestor in cleaned.ancestors().skip(1) {
        match std::fs::canonicalize(ancestor) {
            Ok(real) => {
                let rest = cleaned.strip_prefix(ancestor).map_err(io::Error::other)?;
                return Ok(real.join(rest));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }

    // Nothing exists, not even the root. Only reachable on exotic platforms.
    Ok(cleaned)
}

/// Whether `path` equals `root` or lies beneath it on a segment boundary.
///
/// Both arguments are expected to be cleaned; trailing separators are
/// irrelevant since comparison is per component.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn clean_collapses_dot_segments() {
        let base = Path::new("/work");
        assert_eq!(clean(Path::new("/a/./b/../c"), base), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("src/../lib.rs"), base), PathBuf::from("/work/lib.rs"));
        assert_eq!(clean(Path::new("./"), base), PathBuf::from("/work"));
    }

    #[test]
    fn clean_does_not_climb_above_root() {
        let base = Path::new("/");
        assert_eq!(clean(Path::new("/../../etc"), base), PathBuf::from("/etc"));
        assert_eq!(
            clean(Path::new("/tmp/ws/../../etc/passwd"), base),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn clean_keeps_dotdot_inside_file_names() {
        let base = Path::new("/work");
        assert_eq!(
            clean(Path::new("data..backup.txt"), base),
            PathBuf::from("/work/data..backup.txt")
        );
    }

    #[test]
    fn within_respects_segment_boundaries() {
        let root = Path::new("/home/user");
        assert!(is_within(Path::new("/home/user"), root));
        assert!(is_within(Path::new("/home/user/file"), root));
        assert!(!is_within(Path::new("/home/user2/file"), root));
        assert!(!is_within(Path::new("/home/use"), root));
        assert!(!is_within(Path::new("/home"), root));
    }

    #[test]
    fn within_ignores_trailing_separator_on_root() {
        assert!(is_within(Path::new("/srv/data/x"), Path::new("/srv/data/")));
    }

    #[test]
    fn canonicalize_existing_file() {
        let dir = tempdir().unwrap();
        let real_dir = fs::canonicalize(dir.path()).unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "x").unwrap();

        let resolved = canonicalize(&file, Path::new("/")).unwrap();
        assert_eq!(resolved, real_dir.join("a.txt"));
    }

    #[test]
    fn canonicalize_missing_tail_uses_existing_ancestor() {
        let dir = tempdir().unwrap();
        let real_dir = fs::canonicalize(dir.path()).unwrap();
        let target = dir.path().join("new/deeper/./file.txt");

        let resolved = canonicalize(&target, Path::new("/")).unwrap();
        assert_eq!(resolved, real_dir.join("new/deeper/file.txt"));
    }

    #[test]
    fn canonicalize_relative_against_base() {
        let dir = tempdir().unwrap();
        let real_dir = fs::canonicalize(dir.path()).unwrap();

        let resolved = canonicalize(Path::new("sub/../x.txt"), dir.path()).unwrap();
        assert_eq!(resolved, real_dir.join("x.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn canonicalize_follows_symlinked_parent_of_new_file() {
        let inside = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let real_outside = fs::canonicalize(outside.path()).unwrap();
        let link = inside.path().join("link");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let resolved = canonicalize(&link.join("created.txt"), Path::new("/")).unwrap();
        assert_eq!(resolved, real_outside.join("created.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn canonicalize_reports_file_used_as_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(canonicalize(&file.join("child"), Path::new("/")).is_err());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_]{1,8}"
    }

    proptest! {
        #[test]
        fn sibling_with_longer_name_never_matches(
            parent in segment(),
            name in segment(),
            suffix in segment(),
            tail in segment(),
        ) {
            let root = PathBuf::from(format!("/{parent}/{name}"));
            let sibling = PathBuf::from(format!("/{parent}/{name}{suffix}/{tail}"));
            prop_assert!(!is_within(&sibling, &root));
        }

        #[test]
        fn cleaned_children_stay_within_root(
            root_parts in prop::collection::vec(segment(), 1..4),
            child_parts in prop::collection::vec(segment(), 1..4),
        ) {
            let root = PathBuf::from(format!("/{}", root_parts.join("/")));
            let child = root.join(child_parts.join("/"));
            prop_assert!(is_within(&clean(&child, Path::new("/")), &root));
        }

        #[test]
        fn climbing_past_root_escapes(
            root_parts in prop::collection::vec(segment(), 1..4),
            escape in segment(),
        ) {
            let root = PathBuf::from(format!("/{}", root_parts.join("/")));
            let ups = vec![".."; root_parts.len()].join("/");
            let attempt = root.join(format!("{ups}/X{escape}"));
            let cleaned = clean(&attempt, Path::new("/"));
            prop_assert!(!is_within(&cleaned, &root));
        }
    }
}
