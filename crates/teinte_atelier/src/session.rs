//! Build session context.
//!
//! A [`ThemeSession`] is created when the host configuration is resolved and
//! lives until the process exits. Options are frozen at creation; the only
//! mutable parts are the scope paths, the compiled-style collector and the
//! theme style cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use teinte_pigment::{ForcedColors, ScopedCss};

use crate::arbitrary::ThemeOutput;
use crate::collector::ThemeCollector;
use crate::error::ThemeResult;
use crate::options::{StyleLang, ThemeOptions, ThemePluginOptions};
use crate::registry::ScopeRegistry;

/// Directory under the project root holding generated files and caches.
pub const CACHE_DIR: &str = "node_modules/.teinte";

/// Host command of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCommand {
    #[default]
    Serve,
    Build,
}

impl BuildCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildCommand::Serve => "serve",
            BuildCommand::Build => "build",
        }
    }
}

/// Last computed theme and the inputs it was computed from.
#[derive(Debug, Clone)]
struct CachedThemeStyle {
    /// `None` once invalidated. The output is kept as the fallback.
    key: Option<u64>,
    output: Arc<ThemeOutput>,
}

/// Builder for [`ThemeSession`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    options: ThemeOptions,
    registry: ScopeRegistry,
    langs: Vec<StyleLang>,
    command: BuildCommand,
    root: PathBuf,
}

impl SessionBuilder {
    pub fn new(options: ThemeOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Merge per-language options and scopes in declaration order.
    pub fn from_plugin_options(options: &ThemePluginOptions) -> Self {
        let mut builder = Self::new(ThemeOptions::from_plugin_options(options));
        for (lang, opts) in options.languages() {
            builder.langs.push(lang);
            builder.registry.register_all(&opts.multiple_scope_vars);
        }
        builder
    }

    pub fn command(mut self, command: BuildCommand) -> Self {
        self.command = command;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn lang(mut self, lang: StyleLang) -> Self {
        if !self.langs.contains(&lang) {
            self.langs.push(lang);
        }
        self
    }

    pub fn registry(mut self, registry: ScopeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &ThemeOptions {
        &self.options
    }

    pub fn scope_registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    pub fn build(self) -> Arc<ThemeSession> {
        tracing::debug!(
            command = self.command.as_str(),
            scopes = self.registry.len(),
            arbitrary = self.options.arbitrary_mode,
            "theme session created"
        );
        let forced = ForcedColors::new(&self.options.include_style_with_colors);
        Arc::new(ThemeSession {
            options: self.options,
            command: self.command,
            root: self.root,
            langs: self.langs,
            forced,
            registry: RwLock::new(self.registry),
            collector: Mutex::new(ThemeCollector::new()),
            cache: Mutex::new(None),
        })
    }
}

/// Shared context passed to every engine operation.
#[derive(Debug)]
pub struct ThemeSession {
    options: ThemeOptions,
    command: BuildCommand,
    root: PathBuf,
    langs: Vec<StyleLang>,
    forced: ForcedColors,
    registry: RwLock<ScopeRegistry>,
    collector: Mutex<ThemeCollector>,
    cache: Mutex<Option<CachedThemeStyle>>,
}

impl ThemeSession {
    pub fn builder(options: ThemeOptions) -> SessionBuilder {
        SessionBuilder::new(options)
    }

    #[inline]
    pub fn options(&self) -> &ThemeOptions {
        &self.options
    }

    #[inline]
    pub fn command(&self) -> BuildCommand {
        self.command
    }

    #[inline]
    pub fn is_build(&self) -> bool {
        self.command == BuildCommand::Build
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn langs(&self) -> &[StyleLang] {
        &self.langs
    }

    /// Resolve a configured path against the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    /// Absolute path of the generated runtime theme module.
    pub fn runtime_output_path(&self) -> PathBuf {
        self.resolve_path(&self.options.custom_theme_output_path)
    }

    /// Whether per-scope theme files are extracted in this session.
    pub fn extract_enabled(&self) -> bool {
        self.is_build() && self.options.extract && !self.options.arbitrary_mode
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, ScopeRegistry> {
        self.registry.read()
    }

    pub fn default_scope(&self) -> Option<String> {
        self.registry
            .read()
            .default_scope(&self.options.default_scope_name)
            .map(str::to_string)
    }

    pub fn is_scope_source(&self, file: &Path) -> bool {
        self.registry.read().is_scope_source(file, &self.root)
    }

    /// Extend a scope's variable files. New files invalidate the theme cache.
    pub fn extend_scope_paths<I, P>(&self, scope_name: &str, paths: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let added = self.registry.write().extend_paths(scope_name, paths);
        if added {
            self.invalidate_theme_cache();
        }
        added
    }

    pub fn collector(&self) -> MutexGuard<'_, ThemeCollector> {
        self.collector.lock()
    }

    /// Report a module compiled once per scope.
    ///
    /// Returns the CSS the module itself should carry: the shared part when
    /// theme files are extracted, otherwise shared plus every scoped theme.
    pub fn compile_scoped(&self, module_id: &str, outputs: &[(String, String)]) -> ThemeResult<String> {
        let scoped = ScopedCss::assemble(outputs, &self.forced)?;
        let css = if self.extract_enabled() {
            scoped.common_css()
        } else {
            scoped.combined_css()
        };
        tracing::debug!(module_id, scopes = outputs.len(), "recorded scoped module");
        self.collector.lock().record_scoped(module_id, scoped);
        Ok(css)
    }

    /// Report a module compiled in arbitrary mode. The CSS passes through.
    pub fn compile_arbitrary(&self, module_id: &str, css: &str) -> String {
        tracing::debug!(module_id, "recorded palette source");
        self.collector.lock().record_source(module_id, css);
        css.to_string()
    }

    /// Cached theme when it was computed from `key`.
    pub fn cached_theme(&self, key: u64) -> Option<Arc<ThemeOutput>> {
        self.cache
            .lock()
            .as_ref()
            .filter(|cached| cached.key == Some(key))
            .map(|cached| Arc::clone(&cached.output))
    }

    /// Last computed theme, even if invalidated since.
    pub fn last_theme(&self) -> Option<Arc<ThemeOutput>> {
        self.cache.lock().as_ref().map(|cached| Arc::clone(&cached.output))
    }

    /// Store a computed theme. The latest store wins.
    pub fn store_theme(&self, key: u64, output: Arc<ThemeOutput>) {
        *self.cache.lock() = Some(CachedThemeStyle {
            key: Some(key),
            output,
        });
    }

    pub fn invalidate_theme_cache(&self) {
        if let Some(cached) = self.cache.lock().as_mut() {
            cached.key = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{LanguageOptions, ScopeVarConfig};

    fn plugin_options() -> ThemePluginOptions {
        let mut options = ThemePluginOptions::default();
        options.set(
            StyleLang::Less,
            LanguageOptions {
                multiple_scope_vars: vec![
                    ScopeVarConfig::new("light", ["src/light.less"]),
                    ScopeVarConfig::new("dark", ["src/dark.less"]),
                ],
                ..Default::default()
            },
        );
        options.set(
            StyleLang::Scss,
            LanguageOptions {
                multiple_scope_vars: vec![ScopeVarConfig::new("dark", ["src/dark.scss"])],
                ..Default::default()
            },
        );
        options
    }

    #[test]
    fn test_builder_merges_languages() {
        let session = SessionBuilder::from_plugin_options(&plugin_options())
            .root("/project")
            .command(BuildCommand::Build)
            .build();
        assert_eq!(session.langs(), &[StyleLang::Less, StyleLang::Scss]);
        assert_eq!(session.registry().len(), 2);
        assert_eq!(session.registry().get("dark").unwrap().paths.len(), 2);
        assert_eq!(session.default_scope().as_deref(), Some("light"));
        assert!(session.extract_enabled());
        assert!(session.is_scope_source(Path::new("/project/src/dark.scss")));
    }

    #[test]
    fn test_compile_scoped_depends_on_extraction() {
        let outputs = vec![
            ("light".to_string(), ".a{color:#fff;margin:0}".to_string()),
            ("dark".to_string(), ".a{color:#000;margin:0}".to_string()),
        ];

        let build = SessionBuilder::from_plugin_options(&plugin_options())
            .command(BuildCommand::Build)
            .build();
        assert_eq!(build.compile_scoped("/a.less", &outputs).unwrap(), ".a{margin:0}");

        let serve = SessionBuilder::from_plugin_options(&plugin_options()).build();
        assert_eq!(
            serve.compile_scoped("/a.less", &outputs).unwrap(),
            ".a{margin:0}\n.light .a{color:#fff}\n.dark .a{color:#000}"
        );
        assert_eq!(serve.collector().scoped_modules().count(), 1);
    }

    #[test]
    fn test_theme_cache_invalidation_keeps_fallback() {
        let session = ThemeSession::builder(ThemeOptions::default()).build();
        let output = Arc::new(ThemeOutput::default());
        session.store_theme(7, Arc::clone(&output));
        assert!(session.cached_theme(7).is_some());
        assert!(session.cached_theme(8).is_none());

        session.invalidate_theme_cache();
        assert!(session.cached_theme(7).is_none());
        assert!(session.last_theme().is_some());
    }

    #[test]
    fn test_extend_scope_paths_invalidates() {
        let session = SessionBuilder::from_plugin_options(&plugin_options()).build();
        session.store_theme(1, Arc::new(ThemeOutput::default()));
        assert!(session.extend_scope_paths("light", ["src/extra.less"]));
        assert!(session.cached_theme(1).is_none());
    }
}
