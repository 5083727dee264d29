//! The parts of the host bundler configuration the plugin reads and patches.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::class_name::ScopedNameGenerator;

/// Host configuration model.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub root: PathBuf,
    /// Public base path, `/` by default.
    pub base: String,
    pub css: CssConfig,
    pub server: ServerConfig,
    pub optimize_deps: OptimizeDepsConfig,
    pub build: BuildConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            base: "/".to_string(),
            css: CssConfig::default(),
            server: ServerConfig::default(),
            optimize_deps: OptimizeDepsConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CssConfig {
    /// Options handed to each preprocessor, keyed by language.
    pub preprocessor_options: BTreeMap<String, Map<String, Value>>,
    /// CSS Modules settings. `None` when CSS Modules are disabled.
    pub modules: Option<CssModulesConfig>,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            preprocessor_options: BTreeMap::new(),
            modules: Some(CssModulesConfig::default()),
        }
    }
}

#[derive(Clone, Default)]
pub struct CssModulesConfig {
    pub generate_scoped_name: Option<Arc<dyn ScopedNameGenerator>>,
}

impl fmt::Debug for CssModulesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CssModulesConfig")
            .field("generate_scoped_name", &self.generate_scoped_name.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Default)]
pub struct WatchConfig {
    /// Glob patterns. A leading `!` re-includes matches.
    pub ignored: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeDepsConfig {
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub assets_dir: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            assets_dir: "assets".to_string(),
        }
    }
}

/// Prepend `items` to `list`, dropping existing duplicates of them.
pub(crate) fn prepend_unique(list: &mut Vec<String>, items: &[&str]) {
    list.retain(|existing| !items.contains(&existing.as_str()));
    let mut merged: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    merged.append(list);
    *list = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.base, "/");
        assert_eq!(config.build.assets_dir, "assets");
        assert!(config.css.modules.is_some());
    }

    #[test]
    fn test_prepend_unique() {
        let mut list = vec!["a".to_string(), "x".to_string()];
        prepend_unique(&mut list, &["x", "y"]);
        assert_eq!(list, vec!["x", "y", "a"]);
    }
}
