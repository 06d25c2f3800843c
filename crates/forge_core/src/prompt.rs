//! Prompt construction.
//!
//! Templates use `{slot}` placeholders. `{{` and `}}` render literal braces
//! and any other brace is copied through, so C++ snippets inside a template
//! survive rendering untouched.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::{Captures, Regex};
use tracing::warn;

use forge_config::{PromptRule, RuleSet};
use forge_llm::{CompletionPrompt, DEFAULT_MAX_TOKENS};

use crate::inspector::SourceArtifact;

/// Only the first few callables go into a generation prompt.
pub const MAX_PROMPT_FUNCTIONS: usize = 10;

/// A rendered template and the slots it referenced but did not receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub text: String,
    pub missing: Vec<String>,
}

/// `{slot}` substitution.
#[derive(Debug, Clone)]
pub struct PromptRenderer {
    slot_pattern: Regex,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        Self {
            slot_pattern: Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}")
                .expect("slot pattern is valid"),
        }
    }

    /// Substitute slots. Unknown slots render as empty strings and are reported.
    pub fn render(&self, template: &str, slots: &HashMap<&str, String>) -> RenderedPrompt {
        let mut missing: Vec<String> = Vec::new();
        let text = self
            .slot_pattern
            .replace_all(template, |caps: &Captures| match caps.get(1) {
                Some(name) => match slots.get(name.as_str()) {
                    Some(value) => value.clone(),
                    None => {
                        if !missing.iter().any(|m| m == name.as_str()) {
                            missing.push(name.as_str().to_string());
                        }
                        String::new()
                    }
                },
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            })
            .into_owned();

        RenderedPrompt { text, missing }
    }
}

/// Builds every prompt the pipeline sends, from the shared rule set.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    rules: Arc<RuleSet>,
    renderer: PromptRenderer,
    max_tokens: u32,
}

impl PromptBuilder {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            renderer: PromptRenderer::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Generation prompt for a source file, or `None` when its category has no rule.
    pub fn generation(&self, artifact: &SourceArtifact) -> Option<CompletionPrompt> {
        let rule = self.rules.generation_rule(artifact.category)?;

        let functions: Vec<&str> = artifact
            .callable_names
            .iter()
            .take(MAX_PROMPT_FUNCTIONS)
            .map(String::as_str)
            .collect();

        let mut slots = HashMap::new();
        slots.insert("source_code", artifact.content.clone());
        slots.insert("file_name", artifact.file_name());
        slots.insert("classes", artifact.type_names.join(", "));
        slots.insert("functions", functions.join(", "));
        slots.insert("includes", artifact.dependencies.join(", "));
        slots.insert("category", artifact.category.to_string());

        Some(self.complete_rule(rule, &slots, &artifact.path))
    }

    /// Refinement prompt for an existing test file.
    pub fn refinement(&self, test_path: &Path, test_code: &str) -> CompletionPrompt {
        let mut slots = HashMap::new();
        slots.insert("test_code", test_code.to_string());
        slots.insert("file_name", file_name(test_path));

        self.complete_rule(&self.rules.refine, &slots, test_path)
    }

    /// Build-repair prompt for a diagnostic window.
    pub fn repair(&self, error_output: &str, test_dir: &Path) -> CompletionPrompt {
        let mut slots = HashMap::new();
        slots.insert("error_output", error_output.to_string());
        slots.insert("test_directory", test_dir.to_string_lossy().into_owned());

        self.complete_rule(&self.rules.build_error, &slots, test_dir)
    }

    fn complete_rule(
        &self,
        rule: &PromptRule,
        slots: &HashMap<&str, String>,
        subject: &Path,
    ) -> CompletionPrompt {
        let rendered = self.renderer.render(&rule.prompt_template, slots);
        if !rendered.missing.is_empty() {
            warn!(
                "Template for {:?} references unknown slots ({}); rendered as empty",
                subject,
                rendered.missing.join(", ")
            );
        }

        CompletionPrompt::new(rendered.text)
            .with_system(rule.system_prompt.clone())
            .with_max_tokens(self.max_tokens)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
