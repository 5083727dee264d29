//! Atelier - The theme-scope compilation and substitution engine of Teinte.
//!
//! Themes are declared as named scopes, each with its own variable files.
//! Every stylesheet is compiled once per scope; the engine keeps the parts that
//! differ as theme CSS and hands the rest back as the module's own CSS.
//!
//! Two modes:
//!
//! - **preset**: one class per scope at build time, theme CSS extracted into
//!   one file per scope and linked from the index page;
//! - **arbitrary**: theme CSS is collected and turned into a browser runtime
//!   that re-derives the palette from any primary color.
//!
//! Everything runs against a [`ThemeSession`] created when the host
//! configuration is resolved. [`ThemePlugin`] and [`ThemeHmrPlugin`] adapt
//! host hook events to the engine.
//!
//! # Example
//!
//! ```
//! use teinte_atelier::{BuildCommand, ScopeRegistry, ScopeVarConfig, SessionBuilder, ThemeOptions};
//!
//! let mut registry = ScopeRegistry::new();
//! registry.register(&ScopeVarConfig::new("light", ["src/light.less"]));
//! registry.register(&ScopeVarConfig::new("dark", ["src/dark.less"]));
//!
//! let session = SessionBuilder::new(ThemeOptions::default())
//!     .registry(registry)
//!     .command(BuildCommand::Build)
//!     .build();
//!
//! let own = session
//!     .compile_scoped(
//!         "/src/a.less",
//!         &[
//!             ("light".to_string(), ".a{color:#fff;margin:0}".to_string()),
//!             ("dark".to_string(), ".a{color:#000;margin:0}".to_string()),
//!         ],
//!     )
//!     .unwrap();
//! assert_eq!(own, ".a{margin:0}");
//! assert_eq!(session.collector().theme_css("dark", true), ".dark .a{color:#000}");
//! ```

pub mod arbitrary;
pub mod class_name;
pub mod codegen;
pub mod collector;
pub mod error;
pub mod extract;
pub mod hmr;
pub mod host;
pub mod html;
pub mod options;
pub mod plugin;
pub mod registry;
pub mod session;
pub mod substitute;

pub use arbitrary::{create_set_custom_theme, CreateThemeOptions, ThemeOutput};
pub use class_name::{
    DefaultNameGenerator, ScopeAwareNameGenerator, ScopedClassNames, ScopedNameGenerator,
};
pub use collector::ThemeCollector;
pub use error::{ThemeError, ThemeResult};
pub use extract::{emit_theme_assets, extract_theme_css, EmittedAsset, ExtractOptions, ExtractedTheme};
pub use hmr::{
    CustomThemeUpdate, HmrPhase, HotChannel, HotChannelError, HotUpdateContext,
    HotUpdateCoordinator, HotUpdateOutcome, ModuleNode,
};
pub use host::HostConfig;
pub use html::{inject_tags, HtmlTag};
pub use options::{
    CssFileNamer, InjectTo, LanguageOptions, ScopePaths, ScopeVarConfig, StyleLang,
    StyleTagInjection, ThemeOptions, ThemePluginOptions,
};
pub use plugin::{PluginHandle, ThemeHmrPlugin, ThemePlugin, HMR_PLUGIN_NAME, PLUGIN_NAME};
pub use registry::{ScopeRegistry, ScopeVar};
pub use session::{BuildCommand, SessionBuilder, ThemeSession};
pub use substitute::{InstallOutcome, PreprocessorSubstitution, RuntimeParams, SubstituteParams};
