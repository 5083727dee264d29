//! Scope registry.
//!
//! Scopes are keyed by name. Registering a name twice (for example from the
//! `less` and `scss` configurations) unions the variable files.

use std::path::{Path, PathBuf};

use serde::Serialize;
use teinte_carton::path::path_to_posix;

use crate::options::ScopeVarConfig;

/// A registered scope and its variable files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeVar {
    pub scope_name: String,
    #[serde(rename = "path")]
    pub paths: Vec<PathBuf>,
}

impl ScopeVar {
    fn add_path(&mut self, path: &Path) -> bool {
        let key = path_to_posix(path);
        if self.paths.iter().any(|p| path_to_posix(p) == key) {
            return false;
        }
        self.paths.push(path.to_path_buf());
        true
    }
}

/// Table of declared scopes in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRegistry {
    scopes: Vec<ScopeVar>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope, merging paths into an existing entry of that name.
    pub fn register(&mut self, config: &ScopeVarConfig) {
        let idx = match self.position(&config.scope_name) {
            Some(idx) => idx,
            None => {
                self.scopes.push(ScopeVar {
                    scope_name: config.scope_name.clone(),
                    paths: Vec::new(),
                });
                self.scopes.len() - 1
            }
        };
        for path in config.path.iter() {
            self.scopes[idx].add_path(path);
        }
    }

    pub fn register_all<'a, I>(&mut self, configs: I)
    where
        I: IntoIterator<Item = &'a ScopeVarConfig>,
    {
        for config in configs {
            self.register(config);
        }
    }

    /// Add variable files to a registered scope. Returns whether any was new.
    pub fn extend_paths<I, P>(&mut self, scope_name: &str, paths: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let Some(idx) = self.position(scope_name) else {
            return false;
        };
        let mut added = false;
        for path in paths {
            added |= self.scopes[idx].add_path(path.as_ref());
        }
        added
    }

    #[inline]
    pub fn scopes(&self) -> &[ScopeVar] {
        &self.scopes
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.scope_name.clone()).collect()
    }

    pub fn get(&self, scope_name: &str) -> Option<&ScopeVar> {
        self.scopes.iter().find(|s| s.scope_name == scope_name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Whether `file` is a variable file of any scope.
    ///
    /// Relative registered paths are resolved against `root`.
    pub fn is_scope_source(&self, file: &Path, root: &Path) -> bool {
        let target = path_to_posix(file);
        self.scopes.iter().flat_map(|s| s.paths.iter()).any(|p| {
            let resolved = if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            };
            path_to_posix(&resolved) == target || path_to_posix(p) == target
        })
    }

    /// The configured default scope when registered, otherwise the first one.
    pub fn default_scope(&self, configured: &str) -> Option<&str> {
        self.get(configured)
            .filter(|_| !configured.is_empty())
            .or_else(|| self.scopes.first())
            .map(|s| s.scope_name.as_str())
    }

    fn position(&self, scope_name: &str) -> Option<usize> {
        self.scopes.iter().position(|s| s.scope_name == scope_name)
    }
}
