//! Compiled style collection.
//!
//! The substituted preprocessor reports each compiled module here. In preset
//! mode a module arrives as one output per scope and is assembled into shared
//! and per-scope CSS. In arbitrary mode the plain compiled CSS is kept as the
//! palette source.

use std::collections::BTreeMap;

use teinte_pigment::ScopedCss;

/// Per-module compiled output of a session, keyed by module id.
#[derive(Debug, Clone, Default)]
pub struct ThemeCollector {
    scoped: BTreeMap<String, ScopedCss>,
    sources: BTreeMap<String, String>,
}

impl ThemeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the scoped output of a module.
    pub fn record_scoped(&mut self, module_id: impl Into<String>, scoped: ScopedCss) {
        self.scoped.insert(module_id.into(), scoped);
    }

    /// Record (or replace) the palette source of a module.
    pub fn record_source(&mut self, module_id: impl Into<String>, css: impl Into<String>) {
        self.sources.insert(module_id.into(), css.into());
    }

    /// Forget a module. Returns whether it was known.
    pub fn remove_module(&mut self, module_id: &str) -> bool {
        let scoped = self.scoped.remove(module_id).is_some();
        let source = self.sources.remove(module_id).is_some();
        scoped || source
    }

    pub fn clear(&mut self) {
        self.scoped.clear();
        self.sources.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.scoped.is_empty() && self.sources.is_empty()
    }

    pub fn scoped_modules(&self) -> impl Iterator<Item = (&str, &ScopedCss)> {
        self.scoped.iter().map(|(id, css)| (id.as_str(), css))
    }

    /// Theme CSS of one scope across all modules, in module id order.
    pub fn theme_css(&self, scope: &str, with_scope_name: bool) -> String {
        let parts: Vec<String> = self
            .scoped
            .values()
            .filter_map(|css| css.theme_css(scope, with_scope_name))
            .filter(|css| !css.is_empty())
            .collect();
        parts.join("\n")
    }

    /// Concatenated palette sources in module id order.
    pub fn sources_css(&self) -> String {
        let parts: Vec<&str> = self
            .sources
            .values()
            .map(String::as_str)
            .filter(|css| !css.trim().is_empty())
            .collect();
        parts.join("\n")
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teinte_pigment::ForcedColors;

    fn scoped(light: &str, dark: &str) -> ScopedCss {
        ScopedCss::assemble(
            &[
                ("light".to_string(), light.to_string()),
                ("dark".to_string(), dark.to_string()),
            ],
            &ForcedColors::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_theme_css_across_modules() {
        let mut collector = ThemeCollector::new();
        collector.record_scoped("/src/b.less", scoped(".b{color:#fff}", ".b{color:#000}"));
        collector.record_scoped("/src/a.less", scoped(".a{color:#eee}", ".a{color:#111}"));

        assert_eq!(
            collector.theme_css("dark", true),
            ".dark .a{color:#111}\n.dark .b{color:#000}"
        );
        assert_eq!(collector.theme_css("dark", false), ".a{color:#111}\n.b{color:#000}");
        assert_eq!(collector.theme_css("unknown", true), "");
    }

    #[test]
    fn test_record_replaces_and_remove() {
        let mut collector = ThemeCollector::new();
        collector.record_source("/src/a.less", ".a{color:red}");
        collector.record_source("/src/a.less", ".a{color:blue}");
        collector.record_source("/src/b.less", "  ");
        assert_eq!(collector.sources_css(), ".a{color:blue}");
        assert!(collector.remove_module("/src/a.less"));
        assert!(!collector.remove_module("/src/a.less"));
        assert_eq!(collector.source_count(), 1);
    }
}
