//! Scope-aware CSS Modules class names.
//!
//! Every authored class resolves to one physical class per scope, each backed
//! by that scope's compiled output. The host's own naming strategy still
//! produces the base name.

use std::fmt;
use std::sync::Arc;

use teinte_carton::hash::short_hash;
use teinte_carton::SmallVec;

/// A CSS Modules naming strategy.
pub trait ScopedNameGenerator: Send + Sync {
    /// Physical class for the authored `local` class of `filename`.
    fn generate(&self, local: &str, filename: &str, css: &str) -> String;
}

impl<F> ScopedNameGenerator for F
where
    F: Fn(&str, &str, &str) -> String + Send + Sync,
{
    fn generate(&self, local: &str, filename: &str, css: &str) -> String {
        self(local, filename, css)
    }
}

/// `_[local]_[hash:5]`, hashed over the file and the class.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNameGenerator;

impl ScopedNameGenerator for DefaultNameGenerator {
    fn generate(&self, local: &str, filename: &str, _css: &str) -> String {
        let hash = short_hash(&format!("{filename}:{local}"), 5);
        format!("_{local}_{hash}")
    }
}

/// Physical classes of one authored class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedClassNames {
    pub base: String,
    pub names: SmallVec<[String; 4]>,
}

impl ScopedClassNames {
    /// Value exported to the importing module: all classes, space separated.
    pub fn export_value(&self) -> String {
        self.names.join(" ")
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Wraps a naming strategy and fans each class out over the scopes.
#[derive(Clone)]
pub struct ScopeAwareNameGenerator {
    inner: Arc<dyn ScopedNameGenerator>,
    scopes: Vec<String>,
    arbitrary_mode: bool,
}

impl ScopeAwareNameGenerator {
    pub fn new(
        inner: Option<Arc<dyn ScopedNameGenerator>>,
        scopes: Vec<String>,
        arbitrary_mode: bool,
    ) -> Self {
        Self {
            inner: inner.unwrap_or_else(|| Arc::new(DefaultNameGenerator)),
            scopes,
            arbitrary_mode,
        }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Class names for `local`: one per scope, or the base name alone in
    /// arbitrary mode or without scopes.
    pub fn class_names(&self, local: &str, filename: &str, css: &str) -> ScopedClassNames {
        let base = self.inner.generate(local, filename, css);
        let names = if self.arbitrary_mode || self.scopes.is_empty() {
            SmallVec::from_elem(base.clone(), 1)
        } else {
            self.scopes
                .iter()
                .map(|scope| format!("{base}-{scope}"))
                .collect()
        };
        ScopedClassNames { base, names }
    }
}

impl ScopedNameGenerator for ScopeAwareNameGenerator {
    fn generate(&self, local: &str, filename: &str, css: &str) -> String {
        self.class_names(local, filename, css).export_value()
    }
}

impl fmt::Debug for ScopeAwareNameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeAwareNameGenerator")
            .field("scopes", &self.scopes)
            .field("arbitrary_mode", &self.arbitrary_mode)
            .finish_non_exhaustive()
    }
}
