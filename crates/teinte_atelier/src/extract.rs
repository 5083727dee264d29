//! Theme extraction.
//!
//! Collects the per-scope theme CSS of every scope-duplicated module and
//! turns it into one asset per scope at the end of a production build.

use teinte_carton::path::{posix_join, strip_leading_slashes};

use crate::session::ThemeSession;

#[cfg(feature = "native")]
use lightningcss::printer::PrinterOptions;
#[cfg(feature = "native")]
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};

/// Extraction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Emit plain rules without the scope class prefix.
    pub remove_css_scope_name: bool,
    pub minify: bool,
}

impl ExtractOptions {
    pub fn from_session(session: &ThemeSession) -> Self {
        Self {
            remove_css_scope_name: session.options().remove_css_scope_name,
            minify: session.options().minify,
        }
    }
}

/// Theme CSS of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTheme {
    pub scope_name: String,
    pub css: String,
}

/// A file emitted into the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
    pub file_name: String,
    pub source: String,
}

/// Theme CSS of every registered scope, in registration order.
pub fn extract_theme_css(session: &ThemeSession, options: &ExtractOptions) -> Vec<ExtractedTheme> {
    let scopes = session.registry().scope_names();
    let collector = session.collector();
    scopes
        .into_iter()
        .map(|scope_name| {
            let css = collector.theme_css(&scope_name, !options.remove_css_scope_name);
            let css = if options.minify { minify_css(&css, &scope_name) } else { css };
            ExtractedTheme { scope_name, css }
        })
        .collect()
}

/// Asset file name of a scope under `dir`.
pub fn theme_asset_name(session: &ThemeSession, scope_name: &str, dir: &str) -> String {
    let stem = session
        .options()
        .custom_theme_css_file_name
        .as_ref()
        .and_then(|namer| namer.file_stem(scope_name))
        .unwrap_or_else(|| scope_name.to_string());
    let file = format!("{stem}.css");
    let joined = posix_join([dir, file.as_str()]);
    strip_leading_slashes(&joined).to_string()
}

/// Directory of extracted assets: `outputDir`, or the host assets dir.
pub fn theme_output_dir<'a>(session: &'a ThemeSession, assets_dir: &'a str) -> &'a str {
    let output_dir = session.options().output_dir.as_str();
    if output_dir.is_empty() {
        assets_dir
    } else {
        output_dir
    }
}

/// One asset per scope. Nothing outside a build, without extraction, or in
/// arbitrary mode.
pub fn emit_theme_assets(session: &ThemeSession, assets_dir: &str) -> Vec<EmittedAsset> {
    if !session.extract_enabled() {
        return Vec::new();
    }
    let dir = theme_output_dir(session, assets_dir);
    let assets: Vec<EmittedAsset> = extract_theme_css(session, &ExtractOptions::from_session(session))
        .into_iter()
        .map(|theme| EmittedAsset {
            file_name: theme_asset_name(session, &theme.scope_name, dir),
            source: theme.css,
        })
        .collect();
    tracing::info!(count = assets.len(), dir, "emitting theme assets");
    assets
}

/// Minify CSS, falling back to the input on any failure.
#[cfg(feature = "native")]
pub fn minify_css(css: &str, filename: &str) -> String {
    if css.is_empty() {
        return String::new();
    }
    let parser_options = ParserOptions {
        filename: filename.to_string(),
        ..Default::default()
    };
    let mut stylesheet = match StyleSheet::parse(css, parser_options) {
        Ok(ss) => ss,
        Err(e) => {
            tracing::warn!(filename, "theme CSS parse error: {e}");
            return css.to_string();
        }
    };
    if let Err(e) = stylesheet.minify(MinifyOptions::default()) {
        tracing::warn!(filename, "theme CSS minify error: {e:?}");
        return css.to_string();
    }
    match stylesheet.to_css(PrinterOptions {
        minify: true,
        ..Default::default()
    }) {
        Ok(result) => result.code,
        Err(e) => {
            tracing::warn!(filename, "theme CSS print error: {e:?}");
            css.to_string()
        }
    }
}

#[cfg(not(feature = "native"))]
pub fn minify_css(css: &str, _filename: &str) -> String {
    css.to_string()
}
