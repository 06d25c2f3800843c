//! Blunt whole-directory build fix.

use std::fs;
use std::path::Path;

use glob::Pattern;
use tracing::debug;

use crate::error::CoreResult;

/// Prepend every missing include directive to every `*.<ext>` file in `test_dir`.
///
/// Each include is prepended in list order, so the last entry ends up on
/// the first line. Files that already contain all includes are left alone.
/// Returns the number of files rewritten.
pub fn apply_required_includes(test_dir: &Path, extension: &str, includes: &[String]) -> CoreResult<usize> {
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&test_dir.to_string_lossy()),
        extension
    );

    let mut changed = 0;
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }

        let original = fs::read_to_string(&path)?;
        let mut content = original.clone();
        for include in includes {
            if !content.contains(include.as_str()) {
                content = format!("{}\n{}", include, content);
            }
        }

        if content != original {
            fs::write(&path, &content)?;
            debug!("Added missing includes to {:?}", path);
            changed += 1;
        }
    }

    Ok(changed)
}
