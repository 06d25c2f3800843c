//! Writing completions to test files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CoreResult;

/// Appended to the source stem to name its test file.
pub const TEST_SUFFIX: &str = "Test";
/// Default extension of generated test files.
pub const DEFAULT_TEST_EXTENSION: &str = "cc";

/// Persists completions as `<test_dir>/<SourceStem>Test.<ext>`.
#[derive(Debug, Clone)]
pub struct TestMaterializer {
    test_dir: PathBuf,
    extension: String,
}

impl TestMaterializer {
    pub fn new(test_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            extension: DEFAULT_TEST_EXTENSION.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn test_dir(&self) -> &Path {
        &self.test_dir
    }

    /// Test file path for a source file.
    pub fn test_path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source".to_string());
        self.test_dir
            .join(format!("{}{}.{}", stem, TEST_SUFFIX, self.extension))
    }

    /// Write `completion` verbatim. Nothing is written for `None`.
    pub fn materialize(&self, source: &Path, completion: Option<&str>) -> CoreResult<Option<PathBuf>> {
        let Some(text) = completion else {
            return Ok(None);
        };

        let path = self.test_path_for(source);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        debug!("Wrote {} bytes to {:?}", text.len(), path);

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_derived_path() {
        let materializer = TestMaterializer::new("tests");
        assert_eq!(
            materializer.test_path_for(Path::new("src/controllers/UserController.cc")),
            PathBuf::from("tests/UserControllerTest.cc")
        );

        let cpp = TestMaterializer::new("out").with_extension("cpp");
        assert_eq!(
            cpp.test_path_for(Path::new("a/b/Parser.cxx")),
            PathBuf::from("out/ParserTest.cpp")
        );
    }

    #[test]
    fn test_writes_verbatim_and_creates_dirs() {
        let temp = tempdir().unwrap();
        let materializer = TestMaterializer::new(temp.path().join("nested/tests"));

        let path = materializer
            .materialize(Path::new("User.cc"), Some("TEST(User, Name) {}\n"))
            .unwrap()
            .unwrap();

        assert_eq!(path, temp.path().join("nested/tests/UserTest.cc"));
        assert_eq!(fs::read_to_string(path).unwrap(), "TEST(User, Name) {}\n");
    }

    #[test]
    fn test_empty_completion_writes_nothing() {
        let temp = tempdir().unwrap();
        let materializer = TestMaterializer::new(temp.path());

        let result = materializer.materialize(Path::new("User.cc"), None).unwrap();

        assert!(result.is_none());
        assert!(!temp.path().join("UserTest.cc").exists());
    }
}
