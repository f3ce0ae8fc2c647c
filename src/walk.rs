use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{CaseError, CaseResult};
use crate::utils::ext::Target;

/// List the target files directly inside `root`, sorted by path.
///
/// Only regular files qualify; symlinks are followed, so a link to a
/// regular file counts while a link to a directory does not. There is no
/// recursion. A `root` that cannot be listed fails the whole discovery.
pub fn discover(root: &Path, target: &Target) -> CaseResult<Vec<PathBuf>> {
    let discovery_err = |source| CaseError::Discovery {
        root: root.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(root).map_err(discovery_err)? {
        let entry = entry.map_err(discovery_err)?;
        if !target.matches_name(&entry.file_name()) {
            continue;
        }

        let path = entry.path();
        match fs::metadata(&path) {
            Ok(m) if m.is_file() => {
                tracing::debug!("discovered {}", path.display());
                files.push(path);
            }
            Ok(_) => tracing::debug!("skipping non-file {}", path.display()),
            Err(e) => tracing::debug!("metadata failed for {}: {e}", path.display()),
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
fn names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn discover_keeps_only_regular_lua_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("b.lua"), "-- B").unwrap();
    fs::write(root.join("a.lua"), "-- A").unwrap();
    fs::write(root.join("readme.txt"), "-- Not Lua").unwrap();
    fs::write(root.join("UPPER.LUA"), "-- Wrong Case").unwrap();
    fs::create_dir(root.join("dir.lua")).unwrap();
    fs::create_dir(root.join("nested")).unwrap();
    fs::write(root.join("nested").join("deep.lua"), "-- Deep").unwrap();

    let files = discover(root, &crate::utils::ext::LUA).unwrap();

    assert_eq!(names(&files), vec!["a.lua", "b.lua"]);
    assert!(files.iter().all(|p| p.parent() == Some(root)));
}

#[cfg(unix)]
#[test]
fn discover_follows_file_symlinks_but_not_directory_ones() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(root.join("real.lua"), "-- Real").unwrap();
    fs::create_dir(root.join("folder")).unwrap();
    symlink(root.join("real.lua"), root.join("link.lua")).unwrap();
    symlink(root.join("folder"), root.join("folder.lua")).unwrap();
    symlink(root.join("missing"), root.join("dangling.lua")).unwrap();

    let files = discover(root, &crate::utils::ext::LUA).unwrap();

    assert_eq!(names(&files), vec!["link.lua", "real.lua"]);
}

#[test]
fn discover_fails_on_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = discover(&missing, &crate::utils::ext::LUA).unwrap_err();

    assert!(matches!(err, CaseError::Discovery { ref root, .. } if *root == missing));
}

#[test]
fn discover_on_empty_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(discover(dir.path(), &crate::utils::ext::LUA).unwrap().is_empty());
}
