//! Shallow source inspection.
//!
//! Extraction is lexical and best-effort: the lists may contain false
//! positives (macro invocations look like callables) or miss things
//! (templated declarations). They only ever serve as hints inside a prompt.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use forge_config::Category;

use crate::error::CoreResult;

/// A source file and the metadata extracted from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceArtifact {
    pub path: PathBuf,
    pub content: String,
    /// Declared class names, in source order
    pub type_names: Vec<String>,
    /// Function-like declarations, in source order
    pub callable_names: Vec<String>,
    /// Targets of `#include` directives
    pub dependencies: Vec<String>,
    pub category: Category,
}

impl SourceArtifact {
    /// File name with extension, e.g. `UserController.cc`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Classify a path by substring, first match wins:
/// `Controller` > `models` > `plugins` > unknown.
pub fn classify(path: &Path) -> Category {
    let path = path.to_string_lossy();
    if path.contains("Controller") {
        Category::Controller
    } else if path.contains("models") {
        Category::Model
    } else if path.contains("plugins") {
        Category::Plugin
    } else {
        Category::Unknown
    }
}

/// Extracts types, callables and includes with regular expressions.
#[derive(Debug, Clone)]
pub struct ArtifactInspector {
    type_pattern: Regex,
    callable_pattern: Regex,
    include_pattern: Regex,
}

impl Default for ArtifactInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactInspector {
    pub fn new() -> Self {
        Self {
            // class Name { / class Name : Base
            type_pattern: Regex::new(r"class\s+(\w+)\s*[:{]").expect("type pattern is valid"),
            // ReturnType name(params) { / ;
            callable_pattern: Regex::new(r"\w+\s+(\w+)\s*\([^)]*\)\s*[{;]")
                .expect("callable pattern is valid"),
            include_pattern: Regex::new(r#"#include\s*[<"](.*?)[>"]"#)
                .expect("include pattern is valid"),
        }
    }

    /// Read and inspect a file.
    pub fn inspect(&self, path: &Path) -> CoreResult<SourceArtifact> {
        let content = fs::read_to_string(path)?;
        Ok(self.inspect_content(path, content))
    }

    /// Inspect already-loaded content.
    pub fn inspect_content(&self, path: &Path, content: String) -> SourceArtifact {
        let type_names = Self::captures(&self.type_pattern, &content);
        let callable_names = Self::captures(&self.callable_pattern, &content);
        let dependencies = Self::captures(&self.include_pattern, &content);
        let category = classify(path);

        debug!(
            "Inspected {:?}: category={}, {} types, {} callables, {} includes",
            path,
            category,
            type_names.len(),
            callable_names.len(),
            dependencies.len()
        );

        SourceArtifact {
            path: path.to_path_buf(),
            content,
            type_names,
            callable_names,
            dependencies,
            category,
        }
    }

    fn captures(pattern: &Regex, content: &str) -> Vec<String> {
        pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLLER_SOURCE: &str = r#"
#include "UserController.h"
#include <drogon/HttpController.h>
#include <json/json.h>

class UserController : public drogon::HttpController<UserController> {
  public:
    void getUser(const HttpRequestPtr &req, std::function<void(const HttpResponsePtr &)> &&callback, int id);
    void listUsers(const HttpRequestPtr &req) {
        auto users = fetchAll();
    }
};

class Helper {
};
"#;

    #[test]
    fn test_extracts_types() {
        let artifact = ArtifactInspector::new()
            .inspect_content(Path::new("controllers/UserController.cc"), CONTROLLER_SOURCE.to_string());
        assert_eq!(artifact.type_names, vec!["UserController", "Helper"]);
    }

    #[test]
    fn test_extracts_includes() {
        let artifact = ArtifactInspector::new()
            .inspect_content(Path::new("controllers/UserController.cc"), CONTROLLER_SOURCE.to_string());
        assert_eq!(
            artifact.dependencies,
            vec!["UserController.h", "drogon/HttpController.h", "json/json.h"]
        );
    }

    #[test]
    fn test_extracts_callables() {
        let content = "int add(int a, int b) {\n  return a + b;\n}\nvoid reset();\n";
        let artifact = ArtifactInspector::new()
            .inspect_content(Path::new("src/math.cc"), content.to_string());
        assert_eq!(artifact.callable_names, vec!["add", "reset"]);
    }

    #[test]
    fn test_controller_wins_over_models() {
        assert_eq!(
            classify(Path::new("app/models/UserController.cc")),
            Category::Controller
        );
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(classify(Path::new("app/models/User.cc")), Category::Model);
        assert_eq!(classify(Path::new("app/plugins/models/Jwt.cc")), Category::Model);
        assert_eq!(classify(Path::new("app/plugins/Jwt.cc")), Category::Plugin);
        assert_eq!(classify(Path::new("app/main.cc")), Category::Unknown);
        // Case-sensitive on purpose
        assert_eq!(classify(Path::new("app/controller/users.cc")), Category::Unknown);
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let result = ArtifactInspector::new().inspect(Path::new("/definitely/not/here.cc"));
        assert!(result.is_err());
    }
}
