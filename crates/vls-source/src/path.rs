//! `clean_utf8_path` is adapted from the `path-clean` crate,
//! <https://github.com/danreeves/path-clean> (MIT, Copyright (c) 2018 Dan Reeves).

use std::path::Component;

use camino::Utf8Path;
use camino::Utf8PathBuf;

/// Lexically normalize a path, removing `.` and resolving `..` without
/// touching the filesystem.
#[must_use]
pub fn clean_utf8_path(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Vec::new();

    for comp in path.as_std_path().components() {
        match comp {
            Component::CurDir => (),
            Component::ParentDir => match out.last() {
                Some(Component::RootDir) => (),
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                None | Some(Component::CurDir | Component::ParentDir | Component::Prefix(_)) => {
                    out.push(comp);
                }
            },
            comp => out.push(comp),
        }
    }

    if out.is_empty() {
        return Utf8PathBuf::from(".");
    }

    let cleaned: std::path::PathBuf = out.iter().collect();
    Utf8PathBuf::from_path_buf(cleaned).unwrap_or_else(|original| {
        Utf8PathBuf::from(original.to_string_lossy().into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_removes_dots() {
        assert_eq!(
            clean_utf8_path(Utf8Path::new("/app/src/../components/./Foo.vue")),
            Utf8PathBuf::from("/app/components/Foo.vue")
        );
    }
}
