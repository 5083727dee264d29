//! Error types for the theme engine.

use std::path::{Path, PathBuf};

use teinte_pigment::PigmentError;

use crate::options::StyleLang;

/// Error type for theme engine operations.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// The preprocessor package is neither installed nor saved in the cache.
    #[error(
        "Preprocessor dependency \"{package}\" not found for {lang} styles. Did you install it? (npm install -D {package})"
    )]
    MissingPreprocessor { lang: StyleLang, package: String },

    /// An installed package holds a generated entry but no saved original.
    #[error(
        "Package \"{package}\" at {} holds a generated substitute and no saved original exists. Reinstall it.",
        path.display()
    )]
    UnmarkedSubstitute { package: String, path: PathBuf },

    /// The hot-update plugin was registered without the theme plugin.
    #[error("This plugin depends on the \"{name}\" plugin.")]
    MissingBasePlugin { name: String },

    /// A primary color that is not a color literal.
    #[error("Invalid primary color \"{color}\": {reason}")]
    InvalidPrimaryColor { color: String, reason: String },

    /// A hook that needs the session ran before configuration was resolved.
    #[error("Theme session not resolved. The `config_resolved` hook must run first.")]
    SessionNotResolved,

    /// IO error on a specific path.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory walk error.
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Color or stylesheet error from the palette layer.
    #[error(transparent)]
    Pigment(#[from] PigmentError),
}

impl ThemeError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for theme engine operations.
pub type ThemeResult<T> = Result<T, ThemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_preprocessor_message() {
        let error = ThemeError::MissingPreprocessor {
            lang: StyleLang::Scss,
            package: "sass".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("\"sass\""));
        assert!(msg.contains("scss"));
        assert!(msg.contains("npm install -D sass"));
    }

    #[test]
    fn test_missing_base_plugin_message() {
        let error = ThemeError::MissingBasePlugin {
            name: "teinte-theme-preprocessor".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "This plugin depends on the \"teinte-theme-preprocessor\" plugin."
        );
    }
}
