//! Rule document loading.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::rules::RuleSet;

pub const GENERATE_FILE: &str = "generate_tests.yaml";
pub const REFINE_FILE: &str = "refine_tests.yaml";
pub const BUILD_ERROR_FILE: &str = "build_error_resolution.yaml";

/// Loads the three rule documents from a config directory.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load and parse all documents. Every document is required.
    pub fn load(&self) -> ConfigResult<RuleSet> {
        let generate = self.read_document(GENERATE_FILE)?;
        let refine = self.read_document(REFINE_FILE)?;
        let build_error = self.read_document(BUILD_ERROR_FILE)?;

        let rules = RuleSet::from_documents(&generate, &refine, &build_error)?;
        info!(
            "Loaded prompt rules from {:?} (categories: {})",
            self.config_dir,
            rules
                .categories()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(rules)
    }

    fn read_document(&self, name: &str) -> ConfigResult<String> {
        let path = self.config_dir.join(name);
        if !path.is_file() {
            return Err(ConfigError::NotFound(path));
        }
        debug!("Reading config document {:?}", path);
        Ok(fs::read_to_string(&path)?)
    }
}
