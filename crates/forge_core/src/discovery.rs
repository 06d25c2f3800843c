//! Source file discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};

/// Extensions treated as C++ translation units.
pub const SOURCE_EXTENSIONS: [&str; 3] = ["cc", "cpp", "cxx"];

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

/// A file is returned as-is; a directory is walked recursively and its
/// source files returned sorted. Entries that cannot be read (permission
/// errors, symlink loops) are logged and skipped.
pub fn discover_sources(root: &Path) -> CoreResult<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(CoreError::NoSourceFiles(root.to_path_buf()));
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_source(entry.path()) {
            sources.push(entry.into_path());
        }
    }
    sources.sort();
    debug!("Discovered {} source file(s) under {:?}", sources.len(), root);

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walks_and_sorts() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("controllers")).unwrap();
        fs::create_dir_all(temp.path().join("models")).unwrap();
        fs::write(temp.path().join("models/User.cpp"), "").unwrap();
        fs::write(temp.path().join("controllers/AuthController.cc"), "").unwrap();
        fs::write(temp.path().join("controllers/AuthController.h"), "").unwrap();
        fs::write(temp.path().join("main.cxx"), "").unwrap();
        fs::write(temp.path().join("README.md"), "").unwrap();

        let sources = discover_sources(temp.path()).unwrap();

        assert_eq!(
            sources,
            vec![
                temp.path().join("controllers/AuthController.cc"),
                temp.path().join("main.cxx"),
                temp.path().join("models/User.cpp"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_skipped() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("controllers")).unwrap();
        fs::write(src.join("controllers/AuthController.cc"), "").unwrap();
        std::os::unix::fs::symlink(&src, src.join("controllers/loop")).unwrap();

        let sources = discover_sources(&src).unwrap();

        assert_eq!(sources, vec![src.join("controllers/AuthController.cc")]);
    }

    #[test]
    fn test_single_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("notes.h");
        fs::write(&file, "").unwrap();

        assert_eq!(discover_sources(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_missing_root() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            discover_sources(&temp.path().join("nope")),
            Err(CoreError::NoSourceFiles(_))
        ));
    }
}
