//! Prompt rule tables.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

/// Include directives the blunt build fix guarantees in every test file.
pub const DEFAULT_REQUIRED_INCLUDES: [&str; 2] =
    ["#include <gtest/gtest.h>", "#include <drogon/drogon.h>"];

/// Coarse classification of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Controller,
    Model,
    Plugin,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Model => "model",
            Self::Plugin => "plugin",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "controller" => Ok(Self::Controller),
            "model" => Ok(Self::Model),
            "plugin" => Ok(Self::Plugin),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// A prompt template with named `{slot}` placeholders and its system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRule {
    pub prompt_template: String,
    #[serde(default)]
    pub system_prompt: String,
}

impl PromptRule {
    pub fn new(prompt_template: impl Into<String>) -> Self {
        Self {
            prompt_template: prompt_template.into(),
            system_prompt: String::new(),
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

/// `generate_tests.yaml`
#[derive(Debug, Deserialize)]
struct GenerationDocument {
    #[serde(default)]
    system_prompt: String,
    #[serde(default)]
    rules: HashMap<String, GenerationEntry>,
}

#[derive(Debug, Deserialize)]
struct GenerationEntry {
    prompt_template: String,
    #[serde(default)]
    system_prompt: Option<String>,
}

/// `build_error_resolution.yaml`
#[derive(Debug, Deserialize)]
struct BuildErrorDocument {
    prompt_template: String,
    #[serde(default)]
    system_prompt: String,
    #[serde(default)]
    required_includes: Option<Vec<String>>,
}

/// All rule tables, loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    generation: HashMap<Category, PromptRule>,
    pub refine: PromptRule,
    pub build_error: PromptRule,
    pub required_includes: Vec<String>,
}

impl RuleSet {
    /// Rule set with no generation rules and the default include list.
    pub fn new(refine: PromptRule, build_error: PromptRule) -> Self {
        Self {
            generation: HashMap::new(),
            refine,
            build_error,
            required_includes: DEFAULT_REQUIRED_INCLUDES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_generation_rule(mut self, category: Category, rule: PromptRule) -> Self {
        self.generation.insert(category, rule);
        self
    }

    pub fn with_required_includes(mut self, includes: Vec<String>) -> Self {
        self.required_includes = includes;
        self
    }

    /// Parse the three YAML documents.
    pub fn from_documents(generate: &str, refine: &str, build_error: &str) -> ConfigResult<Self> {
        let generation_doc: GenerationDocument =
            serde_yaml::from_str(generate).map_err(|source| ConfigError::Invalid {
                document: crate::loader::GENERATE_FILE.to_string(),
                source,
            })?;
        let refine_rule: PromptRule =
            serde_yaml::from_str(refine).map_err(|source| ConfigError::Invalid {
                document: crate::loader::REFINE_FILE.to_string(),
                source,
            })?;
        let build_doc: BuildErrorDocument =
            serde_yaml::from_str(build_error).map_err(|source| ConfigError::Invalid {
                document: crate::loader::BUILD_ERROR_FILE.to_string(),
                source,
            })?;

        let mut rules = Self::new(
            refine_rule,
            PromptRule::new(build_doc.prompt_template).with_system(build_doc.system_prompt),
        );
        if let Some(includes) = build_doc.required_includes {
            rules.required_includes = includes;
        }

        for (key, entry) in generation_doc.rules {
            let category = match key.parse::<Category>() {
                Ok(category) => category,
                Err(e) => {
                    warn!("Ignoring generation rule: {}", e);
                    continue;
                }
            };
            let system_prompt = entry
                .system_prompt
                .unwrap_or_else(|| generation_doc.system_prompt.clone());
            rules.generation.insert(
                category,
                PromptRule::new(entry.prompt_template).with_system(system_prompt),
            );
        }

        Ok(rules)
    }

    /// Generation rule for a category, if one is configured.
    pub fn generation_rule(&self, category: Category) -> Option<&PromptRule> {
        self.generation.get(&category)
    }

    /// Categories that have a generation rule.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.generation.keys().copied().collect();
        categories.sort_by_key(|c| c.as_str());
        categories
    }
}
