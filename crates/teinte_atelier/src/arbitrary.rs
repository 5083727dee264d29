//! Arbitrary-color theme compilation.
//!
//! Derives the palette of every collected style source for the default (or a
//! requested) primary color and renders the `setCustomTheme` runtime that
//! re-derives it in the browser.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teinte_carton::hash::hash_parts;
use teinte_pigment::{derive_palette, PaletteConfig, Rgba};

use crate::codegen::RuntimeThemeModule;
use crate::options::ThemeOptions;
use crate::session::ThemeSession;
use crate::substitute::write_file;

/// A computed arbitrary theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeOutput {
    /// Theme CSS for first paint.
    pub style_content: String,
    pub hybrid_value_map: BTreeMap<String, String>,
    pub other_values: BTreeMap<String, String>,
    pub gradient_values: BTreeMap<String, String>,
    pub source_color_map: BTreeMap<String, Vec<String>>,
    /// Source of `const setCustomTheme = ...;`.
    pub set_custom_theme_content: String,
}

impl ThemeOutput {
    /// Runtime module template for this output.
    pub fn runtime_module<'a>(&'a self, options: &'a ThemeOptions) -> RuntimeThemeModule<'a> {
        RuntimeThemeModule {
            default_primary_color: &options.default_primary_color,
            style_tag_id: &options.style_tag_id,
            style_content: &self.style_content,
            hybrid_value_map: &self.hybrid_value_map,
            other_values: &self.other_values,
            gradient_values: &self.gradient_values,
            source_color_map: &self.source_color_map,
        }
    }
}

/// Options of [`create_set_custom_theme`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateThemeOptions {
    /// Reuse the session cache when the inputs are unchanged.
    pub use_cache: bool,
    /// Write the runtime module to `customThemeOutputPath`.
    pub write_runtime_file: bool,
    /// Resolve the palette for this color instead of the default primary.
    pub primary_color: Option<String>,
}

fn cache_key(options: &ThemeOptions, primary_color: Option<&str>, sources: &str) -> u64 {
    let hue = format!(
        "{}:{}",
        options.hue_diff_controls.low, options.hue_diff_controls.high
    );
    let forced: Vec<String> = options
        .include_style_with_colors
        .iter()
        .map(|rule| format!("{}|{}", rule.color, rule.in_gradient))
        .collect();
    let forced = forced.join(",");
    hash_parts([
        options.default_primary_color.as_str(),
        primary_color.unwrap_or(""),
        hue.as_str(),
        forced.as_str(),
        options.style_tag_id.as_str(),
        sources,
    ])
}

/// Compute the arbitrary theme of the session.
///
/// `None` when arbitrary mode is off or derivation fails; callers keep the
/// previously cached theme in that case.
pub fn create_set_custom_theme(
    session: &ThemeSession,
    create: &CreateThemeOptions,
) -> Option<Arc<ThemeOutput>> {
    let options = session.options();
    if !options.arbitrary_mode {
        return None;
    }

    let config = match PaletteConfig::new(
        &options.default_primary_color,
        options.hue_diff_controls,
        &options.include_style_with_colors,
    ) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("invalid defaultPrimaryColor: {e}");
            return None;
        }
    };
    let target = match create.primary_color.as_deref().map(Rgba::parse).transpose() {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!("invalid primary color: {e}");
            return None;
        }
    };

    let sources = session.collector().sources_css();
    let key = cache_key(options, create.primary_color.as_deref(), &sources);
    if create.use_cache {
        if let Some(cached) = session.cached_theme(key) {
            tracing::debug!("reusing cached theme style");
            if create.write_runtime_file {
                write_runtime_file(session, &cached);
            }
            return Some(cached);
        }
    }

    let palette = match derive_palette(&sources, &config, target) {
        Ok(palette) => palette,
        Err(e) => {
            tracing::warn!("palette derivation failed: {e}");
            return None;
        }
    };

    let mut output = ThemeOutput {
        style_content: palette.style_content,
        hybrid_value_map: palette.hybrid_value_map,
        other_values: palette.other_values,
        gradient_values: palette.gradient_values,
        source_color_map: palette.source_color_map,
        set_custom_theme_content: String::new(),
    };
    output.set_custom_theme_content = output.runtime_module(options).render_function();
    let output = Arc::new(output);

    if create.write_runtime_file {
        write_runtime_file(session, &output);
    }
    session.store_theme(key, Arc::clone(&output));
    tracing::debug!(
        colors = output.hybrid_value_map.len(),
        bytes = output.style_content.len(),
        "computed theme style"
    );
    Some(output)
}

fn write_runtime_file(session: &ThemeSession, output: &ThemeOutput) {
    let path = session.runtime_output_path();
    let module = output.runtime_module(session.options()).render_module();
    if let Err(e) = write_file(&path, &module) {
        tracing::warn!("failed to write runtime theme module: {e}");
    }
}
