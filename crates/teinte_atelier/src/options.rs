//! Theme plugin options.
//!
//! Options are declared per stylesheet language and merged into a single
//! [`ThemeOptions`] for the session. JSON keys follow the host configuration
//! surface verbatim.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use teinte_pigment::{ForcedColor, HueDiffControls};

/// Default location of the generated runtime theme module.
pub const DEFAULT_CUSTOM_THEME_OUTPUT_PATH: &str = "node_modules/.teinte/setCustomTheme.js";

static STYLE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(less|scss|sass)(\?.*)?$").expect("valid style id pattern"));

/// A stylesheet language with preprocessor support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLang {
    Less,
    Scss,
    Sass,
}

impl StyleLang {
    /// Declaration order used when merging options.
    pub const ALL: [StyleLang; 3] = [StyleLang::Less, StyleLang::Scss, StyleLang::Sass];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleLang::Less => "less",
            StyleLang::Scss => "scss",
            StyleLang::Sass => "sass",
        }
    }

    /// npm package implementing the language. Both sass syntaxes share one.
    pub fn package_name(self) -> &'static str {
        match self {
            StyleLang::Less => "less",
            StyleLang::Scss | StyleLang::Sass => "sass",
        }
    }

    /// Name of the runtime factory that decorates the implementation.
    pub fn factory_name(self) -> &'static str {
        match self {
            StyleLang::Less => "getLess",
            StyleLang::Scss | StyleLang::Sass => "getSass",
        }
    }

    /// Language of a style module id such as `a.less` or `App.vue?lang.scss`.
    pub fn from_module_id(id: &str) -> Option<Self> {
        let caps = STYLE_ID_RE.captures(id)?;
        match caps.get(1)?.as_str() {
            "less" => Some(StyleLang::Less),
            "scss" => Some(StyleLang::Scss),
            "sass" => Some(StyleLang::Sass),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.as_str() == name)
    }
}

impl fmt::Display for StyleLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a module id is a compiled preprocessor stylesheet.
#[inline]
pub fn is_style_module(id: &str) -> bool {
    STYLE_ID_RE.is_match(id)
}

/// One or more variable files for a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopePaths {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl Default for ScopePaths {
    fn default() -> Self {
        ScopePaths::Many(Vec::new())
    }
}

impl ScopePaths {
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        let slice: &[PathBuf] = match self {
            ScopePaths::One(path) => std::slice::from_ref(path),
            ScopePaths::Many(paths) => paths,
        };
        slice.iter().map(PathBuf::as_path)
    }
}

/// A `multipleScopeVars` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeVarConfig {
    pub scope_name: String,
    #[serde(default)]
    pub path: ScopePaths,
}

impl ScopeVarConfig {
    pub fn new<I, P>(scope_name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            scope_name: scope_name.into(),
            path: ScopePaths::Many(paths.into_iter().map(Into::into).collect()),
        }
    }
}

/// Where an html tag is injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectTo {
    #[default]
    Head,
    HeadPrepend,
    Body,
    BodyPrepend,
}

impl InjectTo {
    pub fn as_str(self) -> &'static str {
        match self {
            InjectTo::Head => "head",
            InjectTo::HeadPrepend => "head-prepend",
            InjectTo::Body => "body",
            InjectTo::BodyPrepend => "body-prepend",
        }
    }
}

/// `InjectDefaultStyleTagToHtml`: `true`, `false`, `"head"` or `"body"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StyleTagInjectionRepr", into = "StyleTagInjectionRepr")]
pub enum StyleTagInjection {
    Disabled,
    #[default]
    Enabled,
    Head,
    Body,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum StyleTagInjectionRepr {
    Flag(bool),
    Place(StyleTagPlace),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StyleTagPlace {
    Head,
    Body,
}

impl From<StyleTagInjectionRepr> for StyleTagInjection {
    fn from(repr: StyleTagInjectionRepr) -> Self {
        match repr {
            StyleTagInjectionRepr::Flag(true) => StyleTagInjection::Enabled,
            StyleTagInjectionRepr::Flag(false) => StyleTagInjection::Disabled,
            StyleTagInjectionRepr::Place(StyleTagPlace::Head) => StyleTagInjection::Head,
            StyleTagInjectionRepr::Place(StyleTagPlace::Body) => StyleTagInjection::Body,
        }
    }
}

impl From<StyleTagInjection> for StyleTagInjectionRepr {
    fn from(value: StyleTagInjection) -> Self {
        match value {
            StyleTagInjection::Disabled => StyleTagInjectionRepr::Flag(false),
            StyleTagInjection::Enabled => StyleTagInjectionRepr::Flag(true),
            StyleTagInjection::Head => StyleTagInjectionRepr::Place(StyleTagPlace::Head),
            StyleTagInjection::Body => StyleTagInjectionRepr::Place(StyleTagPlace::Body),
        }
    }
}

/// Naming of extracted per-scope CSS files.
///
/// From JSON only the template form is available: `"theme-[name]"`.
#[derive(Clone)]
pub enum CssFileNamer {
    Template(String),
    Custom(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>),
}

impl CssFileNamer {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        CssFileNamer::Custom(Arc::new(f))
    }

    /// File stem for a scope. `None` falls back to the scope name.
    pub fn file_stem(&self, scope_name: &str) -> Option<String> {
        let stem = match self {
            CssFileNamer::Template(template) => template.replace("[name]", scope_name),
            CssFileNamer::Custom(f) => f(scope_name)?,
        };
        (!stem.is_empty()).then_some(stem)
    }
}

impl fmt::Debug for CssFileNamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssFileNamer::Template(template) => f.debug_tuple("Template").field(template).finish(),
            CssFileNamer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Serialize for CssFileNamer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CssFileNamer::Template(template) => serializer.serialize_str(template),
            CssFileNamer::Custom(_) => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CssFileNamer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CssFileNamer::Template)
    }
}

/// Options of one stylesheet language, as written in configuration.
///
/// Every scalar is optional so later languages only override what they set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOptions {
    #[serde(default)]
    pub multiple_scope_vars: Vec<ScopeVarConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scope_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_style_with_colors: Option<Vec<ForcedColor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_link_tag_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_link_tag_inject_to: Option<InjectTo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_css_scope_name: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_theme_css_file_name: Option<CssFileNamer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arbitrary_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_theme_output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_tag_id: Option<String>,
    #[serde(
        default,
        rename = "InjectDefaultStyleTagToHtml",
        skip_serializing_if = "Option::is_none"
    )]
    pub inject_default_style_tag_to_html: Option<StyleTagInjection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue_diff_controls: Option<HueDiffControls>,
    /// Minify extracted theme CSS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
}

/// Plugin options keyed by stylesheet language.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemePluginOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less: Option<LanguageOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scss: Option<LanguageOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sass: Option<LanguageOptions>,
}

impl ThemePluginOptions {
    pub fn get(&self, lang: StyleLang) -> Option<&LanguageOptions> {
        match lang {
            StyleLang::Less => self.less.as_ref(),
            StyleLang::Scss => self.scss.as_ref(),
            StyleLang::Sass => self.sass.as_ref(),
        }
    }

    pub fn set(&mut self, lang: StyleLang, options: LanguageOptions) {
        let slot = match lang {
            StyleLang::Less => &mut self.less,
            StyleLang::Scss => &mut self.scss,
            StyleLang::Sass => &mut self.sass,
        };
        *slot = Some(options);
    }

    /// Configured languages in merge order.
    pub fn languages(&self) -> impl Iterator<Item = (StyleLang, &LanguageOptions)> {
        StyleLang::ALL
            .into_iter()
            .filter_map(move |lang| self.get(lang).map(|opts| (lang, opts)))
    }
}

/// Merged options of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeOptions {
    /// Output directory of extracted assets. Empty means the host assets dir.
    pub output_dir: String,
    /// Scope linked by default. Empty means the first registered scope.
    pub default_scope_name: String,
    pub include_style_with_colors: Vec<ForcedColor>,
    pub extract: bool,
    pub theme_link_tag_id: String,
    pub theme_link_tag_inject_to: InjectTo,
    pub remove_css_scope_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_theme_css_file_name: Option<CssFileNamer>,
    pub arbitrary_mode: bool,
    pub default_primary_color: String,
    pub custom_theme_output_path: PathBuf,
    pub style_tag_id: String,
    #[serde(rename = "InjectDefaultStyleTagToHtml")]
    pub inject_default_style_tag_to_html: StyleTagInjection,
    pub hue_diff_controls: HueDiffControls,
    pub minify: bool,
}

impl Default for ThemeOptions {
    fn default() -> Self {
        Self {
            output_dir: String::new(),
            default_scope_name: String::new(),
            include_style_with_colors: Vec::new(),
            extract: true,
            theme_link_tag_id: "theme-link-tag".to_string(),
            theme_link_tag_inject_to: InjectTo::Head,
            remove_css_scope_name: false,
            custom_theme_css_file_name: None,
            arbitrary_mode: false,
            default_primary_color: String::new(),
            custom_theme_output_path: PathBuf::from(DEFAULT_CUSTOM_THEME_OUTPUT_PATH),
            style_tag_id: "custom-theme-tagid".to_string(),
            inject_default_style_tag_to_html: StyleTagInjection::Enabled,
            hue_diff_controls: HueDiffControls::default(),
            minify: false,
        }
    }
}

macro_rules! merge_fields {
    ($target:ident, $source:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$source.$field {
                $target.$field = value.clone();
            }
        )+
    };
}

impl ThemeOptions {
    /// Override every scalar the language sets.
    pub fn merge(&mut self, lang: &LanguageOptions) {
        merge_fields!(
            self,
            lang,
            output_dir,
            default_scope_name,
            include_style_with_colors,
            extract,
            theme_link_tag_id,
            theme_link_tag_inject_to,
            remove_css_scope_name,
            arbitrary_mode,
            default_primary_color,
            custom_theme_output_path,
            style_tag_id,
            inject_default_style_tag_to_html,
            hue_diff_controls,
            minify,
        );
        if let Some(namer) = &lang.custom_theme_css_file_name {
            self.custom_theme_css_file_name = Some(namer.clone());
        }
    }

    /// Merge all languages in declaration order.
    pub fn from_plugin_options(options: &ThemePluginOptions) -> Self {
        let mut merged = Self::default();
        for (_, lang) in options.languages() {
            merged.merge(lang);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_module_ids() {
        assert_eq!(StyleLang::from_module_id("/src/a.less"), Some(StyleLang::Less));
        assert_eq!(
            StyleLang::from_module_id("/src/App.vue?vue&type=style&index=0&lang.scss"),
            Some(StyleLang::Scss)
        );
        assert_eq!(
            StyleLang::from_module_id("/src/a.sass?direct"),
            Some(StyleLang::Sass)
        );
        assert!(!is_style_module("/src/a.css"));
        assert!(!is_style_module("/src/less.js"));
    }

    #[test]
    fn test_package_names() {
        assert_eq!(StyleLang::Less.package_name(), "less");
        assert_eq!(StyleLang::Scss.package_name(), "sass");
        assert_eq!(StyleLang::Sass.factory_name(), "getSass");
    }

    #[test]
    fn test_deserialize_language_options() {
        let json = r##"{
            "multipleScopeVars": [
                { "scopeName": "theme-default", "path": "src/theme/default.less" },
                { "scopeName": "theme-dark", "path": ["src/theme/dark.less", "src/theme/extra.less"] }
            ],
            "arbitraryMode": true,
            "defaultPrimaryColor": "#1890ff",
            "includeStyleWithColors": [{ "color": "#ffffff", "inGradient": true }],
            "InjectDefaultStyleTagToHtml": "head",
            "themeLinkTagInjectTo": "body-prepend",
            "customThemeCssFileName": "theme-[name]",
            "hueDiffControls": { "low": 2, "high": 3 }
        }"##;
        let options: LanguageOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.multiple_scope_vars.len(), 2);
        assert_eq!(
            options.multiple_scope_vars[0].path,
            ScopePaths::One(PathBuf::from("src/theme/default.less"))
        );
        assert_eq!(options.multiple_scope_vars[1].path.iter().count(), 2);
        assert_eq!(options.arbitrary_mode, Some(true));
        assert_eq!(
            options.inject_default_style_tag_to_html,
            Some(StyleTagInjection::Head)
        );
        assert_eq!(options.theme_link_tag_inject_to, Some(InjectTo::BodyPrepend));
        assert_eq!(
            options
                .custom_theme_css_file_name
                .and_then(|n| n.file_stem("dark")),
            Some("theme-dark".to_string())
        );
        assert_eq!(options.hue_diff_controls.map(|h| h.high), Some(3.0));
    }

    #[test]
    fn test_style_tag_injection_bool() {
        let on: StyleTagInjection = serde_json::from_str("true").unwrap();
        let off: StyleTagInjection = serde_json::from_str("false").unwrap();
        assert_eq!(on, StyleTagInjection::Enabled);
        assert_eq!(off, StyleTagInjection::Disabled);
        assert_eq!(serde_json::to_string(&StyleTagInjection::Body).unwrap(), "\"body\"");
    }

    #[test]
    fn test_merge_later_language_wins() {
        let mut options = ThemePluginOptions::default();
        options.set(
            StyleLang::Less,
            LanguageOptions {
                output_dir: Some("less-out".to_string()),
                extract: Some(false),
                ..Default::default()
            },
        );
        options.set(
            StyleLang::Scss,
            LanguageOptions {
                output_dir: Some("scss-out".to_string()),
                ..Default::default()
            },
        );
        let merged = ThemeOptions::from_plugin_options(&options);
        assert_eq!(merged.output_dir, "scss-out");
        assert!(!merged.extract);
        assert_eq!(merged.style_tag_id, "custom-theme-tagid");
    }

    #[test]
    fn test_custom_namer() {
        let namer = CssFileNamer::custom(|scope| (scope != "skip").then(|| format!("t-{scope}")));
        assert_eq!(namer.file_stem("dark"), Some("t-dark".to_string()));
        assert_eq!(namer.file_stem("skip"), None);
        assert_eq!(CssFileNamer::Template(String::new()).file_stem("x"), None);
    }
}
