//! JavaScript code generation.
//!
//! Each generated file has a typed template. Values are embedded as JSON
//! literals, so paths and CSS text never need manual escaping.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::options::ThemeOptions;
use crate::registry::ScopeVar;
use crate::session::BuildCommand;

/// Id of the virtual runtime module.
pub const VIRTUAL_MODULE_ID: &str = "@setCustomTheme";

/// Event carrying a recomputed palette to the page.
pub const CUSTOM_THEME_UPDATE_EVENT: &str = "custom-theme-update";

/// Production stand-in for the runtime function, replaced in rendered chunks.
pub const SET_CUSTOM_THEME_PLACEHOLDER: &str =
    "const setCustomTheme=function(options){window._setCustomTheme_=options;}";

/// The placeholder after a bundler reformatted it.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"const\s+setCustomTheme\s*=\s*function\s*\(\s*options\s*\)\s*\{\s*window\._setCustomTheme_\s*=\s*options\s*;?\s*\}",
    )
    .expect("valid placeholder pattern")
});

const GENERATED_HEADER: &str = "// Generated by teinte. Do not edit.\n";

fn js_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Entry file of a substituted preprocessor package.
///
/// Loads the pristine implementation and hands it to the theme runtime
/// factory together with the session parameters.
#[derive(Debug, Clone)]
pub struct SubstituteEntry<'a> {
    /// Absolute posix path of the pristine entry file.
    pub original_main: &'a str,
    /// Package providing the runtime factories.
    pub runtime_package: &'a str,
    /// `getLess` or `getSass`.
    pub factory: &'a str,
    pub arbitrary_mode: bool,
    pub include_style_with_colors: &'a [teinte_pigment::ForcedColor],
    /// Absolute posix path of the runtime parameter file.
    pub params_file: &'a str,
}

impl SubstituteEntry<'_> {
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(GENERATED_HEADER);
        out.push_str("const nodePreprocessor = require(");
        out.push_str(&js_literal(self.original_main));
        out.push_str(");\n");
        out.push_str("const { ");
        out.push_str(self.factory);
        out.push_str(" } = require(");
        out.push_str(&js_literal(self.runtime_package));
        out.push_str(");\n\n");
        out.push_str("module.exports = ");
        out.push_str(self.factory);
        out.push_str("({\n");
        out.push_str("  implementation: nodePreprocessor,\n");
        out.push_str("  arbitraryMode: ");
        out.push_str(if self.arbitrary_mode { "true" } else { "false" });
        out.push_str(",\n");
        out.push_str("  includeStyleWithColors: ");
        out.push_str(&js_literal(self.include_style_with_colors));
        out.push_str(",\n");
        out.push_str("  paramsFile: ");
        out.push_str(&js_literal(self.params_file));
        out.push_str(",\n});\n");
        out
    }
}

/// Payload the runtime function starts from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeDefaults<'a> {
    primary_color: &'a str,
    style_tag_id: &'a str,
    source_theme_style: &'a str,
    hybrid_value_map: &'a BTreeMap<String, String>,
    other_values: &'a BTreeMap<String, String>,
    gradient_values: &'a BTreeMap<String, String>,
    source_color_map: &'a BTreeMap<String, Vec<String>>,
}

/// The `setCustomTheme` runtime.
#[derive(Debug, Clone)]
pub struct RuntimeThemeModule<'a> {
    pub default_primary_color: &'a str,
    pub style_tag_id: &'a str,
    pub style_content: &'a str,
    pub hybrid_value_map: &'a BTreeMap<String, String>,
    pub other_values: &'a BTreeMap<String, String>,
    pub gradient_values: &'a BTreeMap<String, String>,
    pub source_color_map: &'a BTreeMap<String, Vec<String>>,
}

const RUNTIME_BODY: &str = r#"  const state = Object.assign({}, defaults);
  function hsl(Color, value) {
    const color = Color(value);
    const o = color.hsl().object();
    return { h: o.h || 0, s: o.s || 0, l: o.l || 0, a: color.alpha() };
  }
  function hueDelta(from, to) {
    const d = (((to - from) % 360) + 360) % 360;
    return d > 180 ? d - 360 : d;
  }
  function clamp(v) {
    return Math.min(100, Math.max(0, v));
  }
  function derive(Color, source, from, to) {
    if (Color(from).hex() === Color(to).hex()) return null;
    const s = hsl(Color, source);
    const f = hsl(Color, from);
    const t = hsl(Color, to);
    const h = (((s.h + hueDelta(f.h, t.h)) % 360) + 360) % 360;
    const next = Color.hsl(h, clamp(s.s + t.s - f.s), clamp(s.l + t.l - f.l)).alpha(s.a);
    return s.a < 1 ? next.rgb().string() : next.hex().toLowerCase();
  }
  function protectGradients(css, pinned) {
    if (!pinned.length) return css;
    const re = /[a-z-]*gradient\(/gi;
    let out = "";
    let last = 0;
    let m;
    while ((m = re.exec(css))) {
      let depth = 1;
      let end = re.lastIndex;
      while (end < css.length && depth > 0) {
        if (css[end] === "(") depth++;
        else if (css[end] === ")") depth--;
        end++;
      }
      let segment = css.slice(m.index, end);
      pinned.forEach(function (value, i) {
        segment = segment.split(value).join("\u0001" + i + "\u0001");
      });
      out += css.slice(last, m.index) + segment;
      last = end;
      re.lastIndex = end;
    }
    return out + css.slice(last);
  }
  function apply(css) {
    let tag = document.getElementById(state.styleTagId);
    if (!tag) {
      tag = document.createElement("style");
      tag.id = state.styleTagId;
      tag.type = "text/css";
      document.body.appendChild(tag);
    }
    tag.textContent = css;
  }
  return function (options) {
    options = options || {};
    ["sourceThemeStyle", "hybridValueMap", "otherValues", "gradientValues", "sourceColorMap"].forEach(function (key) {
      if (options[key] !== undefined) state[key] = options[key];
    });
    if (options.Color) state.Color = options.Color;
    if (options.primaryColor) state.currentColor = options.primaryColor;
    const Color = state.Color;
    if (!Color) {
      console.warn("[teinte] setCustomTheme needs the `Color` utility.");
      return;
    }
    const target = state.currentColor || defaults.primaryColor;
    const pairs = Object.keys(state.hybridValueMap).map(function (raw) {
      const current = state.hybridValueMap[raw];
      if (Object.prototype.hasOwnProperty.call(state.otherValues, raw)) {
        return [current, state.otherValues[raw]];
      }
      const derived = derive(Color, raw, defaults.primaryColor, target);
      return [current, derived === null ? current : derived];
    });
    pairs.sort(function (a, b) {
      return b[0].length - a[0].length;
    });
    const pinned = Object.keys(state.gradientValues || {}).map(function (raw) {
      return state.gradientValues[raw];
    });
    let css = protectGradients(state.sourceThemeStyle, pinned);
    pairs.forEach(function (pair, i) {
      css = css.split(pair[0]).join("\u0000" + i + "\u0000");
    });
    pairs.forEach(function (pair, i) {
      css = css.split("\u0000" + i + "\u0000").join(pair[1]);
    });
    pinned.forEach(function (value, i) {
      css = css.split("\u0001" + i + "\u0001").join(value);
    });
    apply(css);
  };
"#;

impl RuntimeThemeModule<'_> {
    fn defaults(&self) -> RuntimeDefaults<'_> {
        RuntimeDefaults {
            primary_color: self.default_primary_color,
            style_tag_id: self.style_tag_id,
            source_theme_style: self.style_content,
            hybrid_value_map: self.hybrid_value_map,
            other_values: self.other_values,
            gradient_values: self.gradient_values,
            source_color_map: self.source_color_map,
        }
    }

    /// `const setCustomTheme = ...;` without an export, for chunk embedding.
    pub fn render_function(&self) -> String {
        let mut out = String::with_capacity(RUNTIME_BODY.len() + self.style_content.len() * 2);
        out.push_str("const setCustomTheme = (function () {\n");
        out.push_str("  const defaults = ");
        out.push_str(&js_literal(&self.defaults()));
        out.push_str(";\n");
        out.push_str(RUNTIME_BODY);
        out.push_str("})();\n");
        out
    }

    /// Standalone module with a default export, written to disk.
    pub fn render_module(&self) -> String {
        let mut out = String::from(GENERATED_HEADER);
        out.push_str(&self.render_function());
        out.push_str("export default setCustomTheme;\n");
        out
    }
}

/// Virtual module content during development.
///
/// Re-exports the generated runtime file and applies pushed palettes.
pub fn dev_virtual_module(runtime_file: &str) -> String {
    let mut out = String::with_capacity(384);
    out.push_str("import setCustomTheme from ");
    out.push_str(&js_literal(runtime_file));
    out.push_str(";\n");
    out.push_str("import Color from \"color\";\n");
    out.push_str("if (import.meta.hot) {\n");
    out.push_str("  import.meta.hot.on(");
    out.push_str(&js_literal(CUSTOM_THEME_UPDATE_EVENT));
    out.push_str(", (data) => {\n");
    out.push_str("    setCustomTheme({ ...data, Color });\n");
    out.push_str("  });\n");
    out.push_str("}\n");
    out.push_str("export default setCustomTheme;\n");
    out
}

/// Virtual module content in production: the placeholder.
pub fn build_virtual_module() -> String {
    let mut out = String::from(SET_CUSTOM_THEME_PLACEHOLDER);
    out.push_str(";export default setCustomTheme;");
    out
}

/// Whether `code` was generated by this crate.
pub fn is_generated(code: &str) -> bool {
    code.starts_with(GENERATED_HEADER)
}

/// Whether a rendered chunk still carries the placeholder.
pub fn has_placeholder(code: &str) -> bool {
    code.contains(SET_CUSTOM_THEME_PLACEHOLDER) || PLACEHOLDER_RE.is_match(code)
}

/// Replace the placeholder in a rendered chunk. `None` when absent.
pub fn replace_placeholder(code: &str, function_source: &str) -> Option<String> {
    let replacement = format!("\n{function_source}\n");
    if code.contains(SET_CUSTOM_THEME_PLACEHOLDER) {
        return Some(code.replacen(SET_CUSTOM_THEME_PLACEHOLDER, &replacement, 1));
    }
    let found = PLACEHOLDER_RE.find(code)?;
    let mut out = String::with_capacity(code.len() + replacement.len());
    out.push_str(&code[..found.start()]);
    out.push_str(&replacement);
    out.push_str(&code[found.end()..]);
    Some(out)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrowserPreprocessorOptions<'a> {
    #[serde(flatten)]
    options: &'a ThemeOptions,
    multiple_scope_vars: &'a [ScopeVar],
}

/// Environment module read by the browser-side theme switcher.
#[derive(Debug, Clone)]
pub struct BrowserEnvModule<'a> {
    pub options: &'a ThemeOptions,
    pub scopes: &'a [ScopeVar],
    pub base_path: &'a str,
    pub assets_dir: &'a str,
    pub command: BuildCommand,
}

impl BrowserEnvModule<'_> {
    pub fn render(&self) -> String {
        let options = BrowserPreprocessorOptions {
            options: self.options,
            multiple_scope_vars: self.scopes,
        };
        let mut out = String::from(GENERATED_HEADER);
        out.push_str("export const browerPreprocessorOptions = ");
        out.push_str(&js_literal(&options));
        out.push_str(";\n");
        out.push_str("export const basePath = ");
        out.push_str(&js_literal(self.base_path));
        out.push_str(";\n");
        out.push_str("export const assetsDir = ");
        out.push_str(&js_literal(self.assets_dir));
        out.push_str(";\n");
        out.push_str("export const buildCommand = ");
        out.push_str(&js_literal(self.command.as_str()));
        out.push_str(";\n");
        out
    }
}
