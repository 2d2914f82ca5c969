//! Lexical path helpers. Nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Fold `.` and `..` components without consulting the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `path` against `base` when it is relative, then normalize.
pub fn resolve(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Express `path` relative to `base`, climbing with `..` where needed.
///
/// Returns `"."` when both point at the same location. When one side is
/// absolute and the other is not there is no common anchor, so the
/// normalized path is returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> String {
    let path = resolve(path, base);
    let base = normalize(base);
    if path.is_absolute() != base.is_absolute() {
        return display(&path);
    }

    let p: Vec<Component> = path.components().collect();
    let b: Vec<Component> = base.components().collect();
    let common = p.iter().zip(&b).take_while(|(x, y)| x == y).count();

    let mut rel = PathBuf::new();
    for _ in common..b.len() {
        rel.push("..");
    }
    for comp in &p[common..] {
        rel.push(comp.as_os_str());
    }
    display(&rel)
}

/// Component depth of `prefix` when it is a path prefix of `path`.
///
/// Matching is per component: `docs/a` is a prefix of `docs/a/b.md` but
/// not of `docs/ab.md`. An empty or `.` prefix matches everything at
/// depth 0.
pub fn prefix_depth(prefix: &str, path: &str) -> Option<usize> {
    let prefix = normalize(Path::new(prefix));
    let path = normalize(Path::new(path));
    if path.starts_with(&prefix) {
        Some(prefix.components().count())
    } else {
        None
    }
}

fn display(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.is_empty() {
        ".".to_string()
    } else {
        s.into_owned()
    }
}
