//! Configuration file loading for teinte.
//!
//! Reads `teinte.config.json` from the current working directory. The file
//! carries the plugin options keyed by language, plus the project root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use teinte_atelier::{StyleLang, ThemeError, ThemePluginOptions, ThemeResult};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "teinte.config.json";

/// Top-level teinte configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TeinteConfig {
    /// JSON Schema reference (for editor autocompletion).
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Project root, relative to the config file. Defaults to its directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Options per stylesheet language (`less`, `scss`, `sass`).
    #[serde(flatten)]
    pub plugin: ThemePluginOptions,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl TeinteConfig {
    /// Project root the commands operate on.
    pub fn project_root(&self) -> PathBuf {
        match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_dir.join(root),
            None => self.base_dir.clone(),
        }
    }

    /// Configured languages, or `requested` when given.
    pub fn langs(&self, requested: &[StyleLang]) -> Vec<StyleLang> {
        if !requested.is_empty() {
            return requested.to_vec();
        }
        self.plugin.languages().map(|(lang, _)| lang).collect()
    }
}

/// Load the configuration.
///
/// `path` points at a config file; otherwise `teinte.config.json` is looked
/// up in the current directory. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> ThemeResult<TeinteConfig> {
    let cwd = std::env::current_dir().unwrap_or_default();
    let config_path = match path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(CONFIG_FILE),
    };
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    if !config_path.exists() {
        tracing::warn!(
            path = %config_path.display(),
            "config file not found, using defaults"
        );
        return Ok(TeinteConfig {
            base_dir,
            ..Default::default()
        });
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|e| ThemeError::io(&config_path, e))?;
    let mut config: TeinteConfig = serde_json::from_str(&content)?;
    config.base_dir = base_dir;
    tracing::debug!(path = %config_path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{
  "root": "app",
  "less": {
    "multipleScopeVars": [{ "scopeName": "light", "path": "src/light.less" }],
    "defaultScopeName": "light"
  },
  "scss": { "arbitraryMode": true, "InjectDefaultStyleTagToHtml": "head" }
}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.project_root(), tmp.path().join("app"));
        assert_eq!(config.langs(&[]), vec![StyleLang::Less, StyleLang::Scss]);
        assert_eq!(config.langs(&[StyleLang::Sass]), vec![StyleLang::Sass]);
        let less = config.plugin.less.as_ref().unwrap();
        assert_eq!(less.multiple_scope_vars[0].scope_name, "light");
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config(Some(&tmp.path().join(CONFIG_FILE))).unwrap();
        assert_eq!(config.project_root(), tmp.path());
        assert!(config.langs(&[]).is_empty());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ \"less\": 5 }").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ThemeError::Json(_))));
    }
}
