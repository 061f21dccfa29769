//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::EntryId;
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error reading one entry's component descriptor.
///
/// These never stop resolution: the entry is treated as using no
/// components and a warning is reported.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor `{}`: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

impl DescriptorError {
    pub fn path(&self) -> &PathBuf {
        match self {
            DescriptorError::Io { path, .. } | DescriptorError::Malformed { path, .. } => path,
        }
    }

    /// Convert to a user-friendly diagnostic for the entry being walked.
    pub fn to_diagnostic(&self, entry: &EntryId) -> Diagnostic {
        let diag = Diagnostic::warning(format!(
            "failed to read component descriptor for `{}`",
            entry
        ))
        .with_location(self.path().clone());

        match self {
            DescriptorError::Io { source, .. } => diag.with_context(source.to_string()),
            DescriptorError::Malformed { message, .. } => diag
                .with_context(message.clone())
                .with_context("the entry is treated as using no components")
                .with_suggestion(suggestions::MALFORMED_DESCRIPTOR),
        }
    }
}

/// Diagnostic for a page (or component) whose script file is missing.
pub fn missing_script(entry: &EntryId, extensions: &[String]) -> Diagnostic {
    Diagnostic::warning(format!("no script found for `{}`", entry))
        .with_context(format!("looked for extensions: {}", extensions.join(", ")))
        .with_context("the entry is left out of the compile entry points")
        .with_suggestion(suggestions::MISSING_SCRIPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_diagnostic() {
        let err = DescriptorError::Malformed {
            path: PathBuf::from("src/pages/index.json"),
            message: "expected value at line 1 column 2".to_string(),
        };
        let diag = err.to_diagnostic(&EntryId::new("pages/index"));
        assert!(diag.is_warning());

        let output = diag.format(false);
        assert!(output.contains("`pages/index`"));
        assert!(output.contains("--> src/pages/index.json"));
        assert!(output.contains("expected value"));
    }

    #[test]
    fn test_missing_script_diagnostic() {
        let diag = missing_script(&EntryId::new("pages/about"), &[".js".into(), ".ts".into()]);
        let output = diag.format(false);
        assert!(output.contains("no script found for `pages/about`"));
        assert!(output.contains(".js, .ts"));
    }
}
