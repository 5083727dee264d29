//! Host plugin facade.
//!
//! [`ThemePlugin`] maps the bundler's hook events onto the engine. Hooks run
//! in host order:
//!
//! ```text
//! config -> config_resolved -> build_start -> (resolve_id / load / render_chunk)*
//!        -> transform_index_html -> generate_bundle
//! ```
//!
//! [`ThemeHmrPlugin`] attaches to the resolved session through the plugin
//! list and drives the [`HotUpdateCoordinator`].

use std::path::PathBuf;
use std::sync::Arc;

use teinte_carton::path::path_to_posix;
use teinte_carton::FxHashSet;

use crate::arbitrary::{create_set_custom_theme, CreateThemeOptions, ThemeOutput};
use crate::class_name::ScopeAwareNameGenerator;
use crate::codegen::{
    build_virtual_module, dev_virtual_module, has_placeholder, replace_placeholder,
    BrowserEnvModule, VIRTUAL_MODULE_ID,
};
use crate::error::{ThemeError, ThemeResult};
use crate::extract::{emit_theme_assets, EmittedAsset};
use crate::hmr::{HotChannel, HotUpdateContext, HotUpdateCoordinator, HotUpdateOutcome};
use crate::host::{prepend_unique, HostConfig};
use crate::html::{inject_tags, theme_link_tag, theme_style_tag, HtmlTag};
use crate::options::ThemePluginOptions;
use crate::session::{BuildCommand, SessionBuilder, ThemeSession};
use crate::substitute::{
    write_file, InstallOutcome, PreprocessorSubstitution, RuntimeParams, SubstituteParams,
    DEFAULT_RUNTIME_PACKAGE,
};

/// Name of the theme plugin in the host plugin list.
pub const PLUGIN_NAME: &str = "teinte-theme-preprocessor";

/// Name of the hot-update plugin.
pub const HMR_PLUGIN_NAME: &str = "teinte-theme-preprocessor-hmr";

/// Re-includes the generated runtime module in the dev server watcher.
pub const RUNTIME_WATCH_PATTERN: &str = "!**/node_modules/**/setCustomTheme.js";

/// Browser utilities the host must not pre-bundle.
pub const BROWSER_UTILS_IDS: [&str; 2] = [
    "@teinte/runtime/browser-utils",
    "@teinte/runtime/browser-utils.js",
];

/// Environment module of the browser utilities, under the cache dir.
pub const BROWSER_ENV_FILE: &str = "browser-env.js";

/// What other plugins see of a plugin in the host plugin list.
#[derive(Debug, Clone)]
pub struct PluginHandle {
    pub name: String,
    /// Resolved session, once `config_resolved` ran.
    pub api: Option<Arc<ThemeSession>>,
}

/// The theme plugin.
#[derive(Debug)]
pub struct ThemePlugin {
    options: ThemePluginOptions,
    builder: SessionBuilder,
    command: BuildCommand,
    session: Option<Arc<ThemeSession>>,
    base: String,
    assets_dir: String,
    last_runtime_output: Option<PathBuf>,
    runtime_package: String,
}

impl ThemePlugin {
    pub fn new(options: ThemePluginOptions) -> Self {
        let builder = SessionBuilder::from_plugin_options(&options);
        Self {
            options,
            builder,
            command: BuildCommand::default(),
            session: None,
            base: "/".to_string(),
            assets_dir: "assets".to_string(),
            last_runtime_output: None,
            runtime_package: DEFAULT_RUNTIME_PACKAGE.to_string(),
        }
    }

    /// Use another package for the substitute runtime factories.
    pub fn with_runtime_package(mut self, package: impl Into<String>) -> Self {
        self.runtime_package = package.into();
        self
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn handle(&self) -> PluginHandle {
        PluginHandle {
            name: PLUGIN_NAME.to_string(),
            api: self.session.clone(),
        }
    }

    pub fn session(&self) -> ThemeResult<&Arc<ThemeSession>> {
        self.session.as_ref().ok_or(ThemeError::SessionNotResolved)
    }

    fn substitution(&self, session: &ThemeSession) -> PreprocessorSubstitution {
        PreprocessorSubstitution::for_session(session).with_runtime_package(&self.runtime_package)
    }

    /// Patch the host configuration.
    pub fn config(&mut self, host: &mut HostConfig, command: BuildCommand) -> ThemeResult<()> {
        self.command = command;

        for (lang, options) in self.options.languages() {
            if options.multiple_scope_vars.is_empty() {
                continue;
            }
            let value = serde_json::to_value(&options.multiple_scope_vars)?;
            host.css
                .preprocessor_options
                .entry(lang.as_str().to_string())
                .or_default()
                .insert("multipleScopeVars".to_string(), value);
        }

        let arbitrary_mode = self.builder.options().arbitrary_mode;
        if let Some(modules) = host.css.modules.as_mut() {
            if !arbitrary_mode {
                let generator = ScopeAwareNameGenerator::new(
                    modules.generate_scoped_name.take(),
                    self.builder.scope_registry().scope_names(),
                    false,
                );
                modules.generate_scoped_name = Some(Arc::new(generator));
            }
        }

        prepend_unique(&mut host.server.watch.ignored, &[RUNTIME_WATCH_PATTERN]);
        prepend_unique(&mut host.optimize_deps.exclude, &BROWSER_UTILS_IDS);

        tracing::debug!(
            command = command.as_str(),
            scopes = self.builder.scope_registry().len(),
            arbitrary = arbitrary_mode,
            "patched host config"
        );
        Ok(())
    }

    /// Create the session from the resolved host configuration.
    pub fn config_resolved(&mut self, host: &HostConfig) -> ThemeResult<Arc<ThemeSession>> {
        let session = self
            .builder
            .clone()
            .command(self.command)
            .root(&host.root)
            .build();
        self.base = host.base.clone();
        self.assets_dir = host.build.assets_dir.clone();

        self.substitution(&session)
            .write_runtime_params(&RuntimeParams::from_session(&session))?;

        if session.options().arbitrary_mode {
            let output_path = session.runtime_output_path();
            if self.last_runtime_output.as_ref() != Some(&output_path) {
                create_set_custom_theme(
                    &session,
                    &CreateThemeOptions {
                        use_cache: true,
                        write_runtime_file: true,
                        primary_color: None,
                    },
                );
                self.last_runtime_output = Some(output_path);
            }
        } else {
            let registry = session.registry();
            let module = BrowserEnvModule {
                options: session.options(),
                scopes: registry.scopes(),
                base_path: &self.base,
                assets_dir: &self.assets_dir,
                command: self.command,
            };
            write_file(&session.cache_dir().join(BROWSER_ENV_FILE), &module.render())?;
        }

        self.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Install a substitute for every configured language.
    pub fn build_start(&self) -> ThemeResult<Vec<InstallOutcome>> {
        let session = self.session()?;
        let substitution = self.substitution(session);
        let params = SubstituteParams::from_options(session.options());
        let mut packages = FxHashSet::default();
        let mut outcomes = Vec::with_capacity(session.langs().len());
        for &lang in session.langs() {
            if packages.insert(lang.package_name()) {
                outcomes.push(substitution.install(lang, &params)?);
            }
        }
        Ok(outcomes)
    }

    pub fn resolve_id(&self, id: &str) -> Option<&'static str> {
        (id == VIRTUAL_MODULE_ID).then_some(VIRTUAL_MODULE_ID)
    }

    /// Content of the virtual runtime module. Arbitrary mode only.
    pub fn load(&self, id: &str) -> Option<String> {
        if id != VIRTUAL_MODULE_ID {
            return None;
        }
        let session = self.session.as_ref()?;
        if !session.options().arbitrary_mode {
            return None;
        }
        if session.is_build() {
            Some(build_virtual_module())
        } else {
            Some(dev_virtual_module(&path_to_posix(
                &session.runtime_output_path(),
            )))
        }
    }

    /// Swap the runtime placeholder of a production chunk for the real
    /// function. `None` leaves the chunk untouched.
    pub fn render_chunk(&self, code: &str) -> Option<String> {
        let session = self.session.as_ref()?;
        if !session.options().arbitrary_mode || !has_placeholder(code) {
            return None;
        }
        let output = create_set_custom_theme(session, &CreateThemeOptions::default())
            .or_else(|| session.last_theme())?;
        replace_placeholder(code, &output.set_custom_theme_content)
    }

    /// Tags for the index page.
    pub fn transform_index_html(&self) -> Vec<HtmlTag> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        if session.options().arbitrary_mode {
            self.current_theme(session)
                .and_then(|output| theme_style_tag(session, &output.style_content))
                .into_iter()
                .collect()
        } else {
            theme_link_tag(session, &self.base, &self.assets_dir)
                .into_iter()
                .collect()
        }
    }

    /// The index page with its tags injected.
    pub fn index_html(&self, html: &str) -> String {
        inject_tags(html, &self.transform_index_html())
    }

    /// Extracted per-scope theme assets.
    pub fn generate_bundle(&self) -> Vec<EmittedAsset> {
        match self.session.as_ref() {
            Some(session) => emit_theme_assets(session, &self.assets_dir),
            None => Vec::new(),
        }
    }

    fn current_theme(&self, session: &ThemeSession) -> Option<Arc<ThemeOutput>> {
        create_set_custom_theme(
            session,
            &CreateThemeOptions {
                use_cache: true,
                ..Default::default()
            },
        )
        .or_else(|| session.last_theme())
    }
}

/// The hot-update plugin. Must run after the theme plugin.
#[derive(Debug, Default)]
pub struct ThemeHmrPlugin {
    coordinator: Option<HotUpdateCoordinator>,
}

impl ThemeHmrPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &'static str {
        HMR_PLUGIN_NAME
    }

    /// Attach to the theme plugin found in `plugins`.
    pub fn build_start(&mut self, plugins: &[PluginHandle]) -> ThemeResult<()> {
        self.coordinator = Some(HotUpdateCoordinator::from_plugins(plugins)?);
        Ok(())
    }

    pub fn coordinator(&self) -> Option<&HotUpdateCoordinator> {
        self.coordinator.as_ref()
    }

    pub fn transform(&self, module_id: &str) -> Option<Arc<ThemeOutput>> {
        self.coordinator.as_ref()?.on_transform(module_id)
    }

    pub fn handle_hot_update(
        &self,
        ctx: &HotUpdateContext<'_>,
        channel: Option<Arc<dyn HotChannel>>,
    ) -> HotUpdateOutcome {
        match &self.coordinator {
            Some(coordinator) => coordinator.handle_hot_update(ctx, channel),
            None => HotUpdateOutcome::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_name::ScopedNameGenerator;
    use crate::host::CssModulesConfig;
    use crate::options::{LanguageOptions, ScopeVarConfig, StyleLang};

    fn preset_options() -> ThemePluginOptions {
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
        options
    }

    fn arbitrary_options() -> ThemePluginOptions {
        let mut options = ThemePluginOptions::default();
        options.set(
            StyleLang::Scss,
            LanguageOptions {
                multiple_scope_vars: vec![ScopeVarConfig::new("theme", ["src/vars.scss"])],
                arbitrary_mode: Some(true),
                default_primary_color: Some("#1890ff".to_string()),
                ..Default::default()
            },
        );
        options
    }

    fn resolved(options: ThemePluginOptions, command: BuildCommand) -> (ThemePlugin, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let mut plugin = ThemePlugin::new(options);
        let mut host = HostConfig {
            root: tmp.path().to_path_buf(),
            ..Default::default()
        };
        plugin.config(&mut host, command).unwrap();
        plugin.config_resolved(&host).unwrap();
        (plugin, tmp)
    }

    #[test]
    fn test_config_patches_host() {
        let mut host = HostConfig::default();
        host.server.watch.ignored.push("**/tmp/**".to_string());
        host.optimize_deps.exclude.push("lodash".to_string());
        host.css
            .preprocessor_options
            .entry("less".to_string())
            .or_default()
            .insert("javascriptEnabled".to_string(), serde_json::Value::Bool(true));

        let mut plugin = ThemePlugin::new(preset_options());
        plugin.config(&mut host, BuildCommand::Build).unwrap();

        let less = &host.css.preprocessor_options["less"];
        assert_eq!(less["javascriptEnabled"], serde_json::Value::Bool(true));
        assert_eq!(less["multipleScopeVars"][1]["scopeName"], "dark");
        assert!(!host.css.preprocessor_options.contains_key("scss"));
        assert_eq!(host.server.watch.ignored, vec![RUNTIME_WATCH_PATTERN, "**/tmp/**"]);
        assert_eq!(host.optimize_deps.exclude[2], "lodash");

        let generator = host.css.modules.unwrap().generate_scoped_name.unwrap();
        let names = generator.generate("btn", "/src/a.module.less", "");
        assert_eq!(names.split(' ').count(), 2);
        assert!(names.ends_with("-dark"));
    }

    #[test]
    fn test_config_wraps_existing_generator() {
        let mut host = HostConfig::default();
        let existing: Arc<dyn ScopedNameGenerator> =
            Arc::new(|local: &str, _: &str, _: &str| format!("x-{local}"));
        host.css.modules = Some(CssModulesConfig {
            generate_scoped_name: Some(existing),
        });
        let mut plugin = ThemePlugin::new(preset_options());
        plugin.config(&mut host, BuildCommand::Serve).unwrap();
        let generator = host.css.modules.unwrap().generate_scoped_name.unwrap();
        assert_eq!(generator.generate("btn", "a", ""), "x-btn-light x-btn-dark");
    }

    #[test]
    fn test_config_leaves_modules_alone() {
        let mut host = HostConfig::default();
        let mut plugin = ThemePlugin::new(arbitrary_options());
        plugin.config(&mut host, BuildCommand::Serve).unwrap();
        assert!(host.css.modules.unwrap().generate_scoped_name.is_none());

        let mut host = HostConfig::default();
        host.css.modules = None;
        let mut plugin = ThemePlugin::new(preset_options());
        plugin.config(&mut host, BuildCommand::Serve).unwrap();
        assert!(host.css.modules.is_none());
    }

    #[test]
    fn test_hooks_before_resolution() {
        let plugin = ThemePlugin::new(preset_options());
        assert!(matches!(plugin.build_start(), Err(ThemeError::SessionNotResolved)));
        assert!(plugin.handle().api.is_none());
        assert!(plugin.transform_index_html().is_empty());
        assert!(plugin.generate_bundle().is_empty());
    }

    #[test]
    fn test_preset_resolution_writes_browser_env() {
        let (plugin, _tmp) = resolved(preset_options(), BuildCommand::Build);
        let session = plugin.session().unwrap();
        let env = std::fs::read_to_string(session.cache_dir().join(BROWSER_ENV_FILE)).unwrap();
        assert!(env.contains("export const buildCommand = \"build\";"));
        assert!(env.contains("\"scopeName\":\"light\""));

        let params = PreprocessorSubstitution::for_session(session).params_path();
        let params: RuntimeParams =
            serde_json::from_str(&std::fs::read_to_string(params).unwrap()).unwrap();
        assert!(params.extract);
        assert_eq!(params.scope_names, vec!["light", "dark"]);
        assert!(plugin.load(VIRTUAL_MODULE_ID).is_none());
    }

    #[test]
    fn test_preset_link_tag_and_assets() {
        let (plugin, _tmp) = resolved(preset_options(), BuildCommand::Build);
        let session = plugin.session().unwrap();
        session
            .compile_scoped(
                "/src/a.less",
                &[
                    ("light".to_string(), ".a{color:#fff}".to_string()),
                    ("dark".to_string(), ".a{color:#000}".to_string()),
                ],
            )
            .unwrap();

        let html = plugin.index_html("<html><head></head><body></body></html>");
        assert_eq!(
            html,
            "<html><head><link href=\"/assets/light.css\" id=\"theme-link-tag\" rel=\"stylesheet\"></head><body></body></html>"
        );
        let assets = plugin.generate_bundle();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].file_name, "assets/dark.css");
        assert_eq!(assets[1].source, ".dark .a{color:#000}");
    }

    #[test]
    fn test_arbitrary_resolution_writes_runtime_module() {
        let (plugin, _tmp) = resolved(arbitrary_options(), BuildCommand::Serve);
        let session = plugin.session().unwrap();
        let runtime = std::fs::read_to_string(session.runtime_output_path()).unwrap();
        assert!(runtime.contains("export default setCustomTheme;"));

        assert_eq!(plugin.resolve_id(VIRTUAL_MODULE_ID), Some(VIRTUAL_MODULE_ID));
        assert_eq!(plugin.resolve_id("vue"), None);
        let module = plugin.load(VIRTUAL_MODULE_ID).unwrap();
        assert!(module.contains("custom-theme-update"));
        assert!(module.contains(&path_to_posix(&session.runtime_output_path())));
    }

    #[test]
    fn test_arbitrary_build_chunk_and_style_tag() {
        let (plugin, _tmp) = resolved(arbitrary_options(), BuildCommand::Build);
        let session = plugin.session().unwrap();
        session.compile_arbitrary("/src/a.scss", ".btn{color:#1890ff;margin:0}");

        let module = plugin.load(VIRTUAL_MODULE_ID).unwrap();
        let chunk = format!("var x=1;{module}");
        let rendered = plugin.render_chunk(&chunk).unwrap();
        assert!(!has_placeholder(&rendered));
        assert!(rendered.contains("const setCustomTheme = (function () {"));
        assert!(rendered.contains(".btn{color:#1890ff}"));
        assert!(plugin.render_chunk("var x=1;").is_none());

        let tags = plugin.transform_index_html();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].children.as_deref(), Some(".btn{color:#1890ff}"));
        assert!(plugin.generate_bundle().is_empty());
    }

    #[test]
    fn test_hmr_plugin_attaches_to_session() {
        let (plugin, _tmp) = resolved(arbitrary_options(), BuildCommand::Serve);
        let mut hmr = ThemeHmrPlugin::new();
        assert!(hmr.build_start(&[]).is_err());
        hmr.build_start(&[
            PluginHandle {
                name: "vite:css".to_string(),
                api: None,
            },
            plugin.handle(),
        ])
        .unwrap();
        let coordinator = hmr.coordinator().unwrap();
        assert!(Arc::ptr_eq(coordinator.session(), plugin.session().unwrap()));
    }
}
