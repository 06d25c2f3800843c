//! # forge_config
//!
//! Prompt rule documents for testforge.
//!
//! Three YAML documents drive every LLM call the pipeline makes:
//!
//! - `generate_tests.yaml`: one prompt template per source category
//! - `refine_tests.yaml`: the generic refinement template
//! - `build_error_resolution.yaml`: the build-repair template
//!
//! They are loaded once at startup into an immutable [`RuleSet`]. A missing
//! or malformed document is a fatal error.
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_config::{Category, ConfigLoader};
//!
//! let rules = ConfigLoader::new(".").load().unwrap();
//! if let Some(rule) = rules.generation_rule(Category::Controller) {
//!     println!("{}", rule.prompt_template);
//! }
//! ```

pub mod error;
pub mod loader;
pub mod rules;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, BUILD_ERROR_FILE, GENERATE_FILE, REFINE_FILE};
pub use rules::{Category, PromptRule, RuleSet, DEFAULT_REQUIRED_INCLUDES};
