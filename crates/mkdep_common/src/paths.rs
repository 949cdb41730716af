//! Lexical path normalization shared by the scanners and the rule writer.
//!
//! None of these functions touch the filesystem: symlinks are not resolved,
//! and `..` is folded against the preceding component textually.

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: drops `.` components and folds `..` into the
/// preceding normal component.
///
/// Leading `..` components of a relative path are kept; `..` directly after
/// the root is dropped.
pub fn collapse(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Joins `file` onto `dir` and collapses the result.
///
/// An absolute `file` is returned collapsed without consulting `dir`.
pub fn join_collapsed(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() || dir.as_os_str().is_empty() {
        return collapse(file);
    }
    collapse(&dir.join(file))
}

/// Renders a path with forward slashes regardless of the host separator.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_removes_cur_dir() {
        assert_eq!(collapse(Path::new("/a/./b/./c.h")), PathBuf::from("/a/b/c.h"));
    }

    #[test]
    fn collapse_folds_parent_dir() {
        assert_eq!(collapse(Path::new("/a/b/../c.h")), PathBuf::from("/a/c.h"));
    }

    #[test]
    fn collapse_keeps_leading_parent_of_relative() {
        assert_eq!(collapse(Path::new("../../x.h")), PathBuf::from("../../x.h"));
    }

    #[test]
    fn collapse_parent_at_root_is_dropped() {
        assert_eq!(collapse(Path::new("/../x.h")), PathBuf::from("/x.h"));
    }

    #[test]
    fn collapse_empty_is_dot() {
        assert_eq!(collapse(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn join_relative() {
        assert_eq!(
            join_collapsed(Path::new("/src/include"), Path::new("../lib/x.h")),
            PathBuf::from("/src/lib/x.h")
        );
    }

    #[test]
    fn join_absolute_ignores_dir() {
        assert_eq!(
            join_collapsed(Path::new("/src"), Path::new("/usr/include/x.h")),
            PathBuf::from("/usr/include/x.h")
        );
    }

    #[test]
    fn to_slash_plain() {
        assert_eq!(to_slash(Path::new("a/b/c")), "a/b/c");
    }
}
