//! Palette derivation for arbitrary-color themes.
//!
//! Every color literal of the source styles is classified against the
//! primary color:
//!
//! - **forced**: it matches an `includeStyleWithColors` rule and is emitted
//!   verbatim as configured;
//! - **derived**: its hue lies within the hue-diff window around the primary
//!   hue, so it moves with the primary color;
//! - **unrelated**: anything else, left untouched.
//!
//! Precedence: an exact forced rule (`inGradient: false`) beats everything;
//! an `inGradient: true` rule beats hue derivation, but only for literals
//! inside a `*-gradient(...)` call. Outside gradients such a literal is
//! classified by hue like any other.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::{hue_delta, Hsla, Rgba};
use crate::css::{parse_stylesheet, Declaration};
use crate::error::PigmentResult;
use crate::scan::{find_colors, replace_colors, ColorMatch};
use crate::scope::{flatten, render_entries, FlatEntry, FlatItem};

/// Slack applied on both sides of the hue window, absorbing 8-bit rounding.
const HUE_TOLERANCE: f64 = 0.5;

/// Hue window around the primary color, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HueDiffControls {
    /// Degrees below the primary hue still considered related.
    #[serde(default)]
    pub low: f64,
    /// Degrees above the primary hue still considered related.
    #[serde(default)]
    pub high: f64,
}

/// A color whose styles are always theme styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcedColor {
    pub color: String,
    /// Only match occurrences inside gradients.
    #[serde(default)]
    pub in_gradient: bool,
}

impl ForcedColor {
    pub fn new(color: impl Into<String>, in_gradient: bool) -> Self {
        Self {
            color: color.into(),
            in_gradient,
        }
    }
}

/// Parsed set of forced colors. Unparseable entries are skipped with a warning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForcedColors {
    rules: Vec<(Rgba, ForcedColor)>,
}

impl ForcedColors {
    pub fn new(colors: &[ForcedColor]) -> Self {
        let rules = colors
            .iter()
            .filter_map(|rule| match Rgba::parse(&rule.color) {
                Ok(color) => Some((color, rule.clone())),
                Err(e) => {
                    tracing::warn!("ignoring includeStyleWithColors entry: {e}");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Configured value for a literal, if a rule applies to it.
    ///
    /// Exact rules are consulted before gradient rules.
    pub fn resolve(&self, m: &ColorMatch<'_>) -> Option<&str> {
        let exact = self
            .rules
            .iter()
            .find(|(color, rule)| !rule.in_gradient && color.same_as(&m.color));
        let found = exact.or_else(|| {
            m.in_gradient
                .then(|| {
                    self.rules
                        .iter()
                        .find(|(color, rule)| rule.in_gradient && color.same_as(&m.color))
                })
                .flatten()
        });
        found.map(|(_, rule)| rule.color.as_str())
    }

    /// Whether any literal in `value` is forced.
    pub fn matches_value(&self, value: &str) -> bool {
        !self.is_empty() && find_colors(value).iter().any(|m| self.resolve(m).is_some())
    }
}

/// How a literal takes part in the palette.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorRole {
    Forced(String),
    Derived,
    Unrelated,
}

/// Inputs of palette derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteConfig {
    pub primary: Rgba,
    pub hue_diff: HueDiffControls,
    pub forced: ForcedColors,
}

impl PaletteConfig {
    pub fn new(
        primary: &str,
        hue_diff: HueDiffControls,
        forced: &[ForcedColor],
    ) -> PigmentResult<Self> {
        Ok(Self {
            primary: Rgba::parse(primary)?,
            hue_diff,
            forced: ForcedColors::new(forced),
        })
    }

    pub fn classify(&self, m: &ColorMatch<'_>) -> ColorRole {
        if let Some(value) = self.forced.resolve(m) {
            return ColorRole::Forced(value.to_string());
        }
        if self.is_related(m.color) {
            ColorRole::Derived
        } else {
            ColorRole::Unrelated
        }
    }

    /// Whether `color` falls inside the hue window around the primary.
    pub fn is_related(&self, color: Rgba) -> bool {
        let hsla = color.to_hsla();
        if hsla.is_achromatic() {
            return false;
        }
        let delta = hue_delta(self.primary.to_hsla().h, hsla.h);
        delta >= -(self.hue_diff.low.max(0.0) + HUE_TOLERANCE)
            && delta <= self.hue_diff.high.max(0.0) + HUE_TOLERANCE
    }
}

/// Move `source` the way the primary moved from `from` to `to`.
///
/// Hue rotates by the primary's hue change, saturation and lightness shift by
/// the primary's changes, alpha is kept. Identity when `from == to`.
pub fn derive_color(source: Rgba, from: Rgba, to: Rgba) -> Rgba {
    if from.same_as(&to) {
        return source;
    }
    let s = source.to_hsla();
    let f = from.to_hsla();
    let t = to.to_hsla();
    Hsla {
        h: (s.h + hue_delta(f.h, t.h)).rem_euclid(360.0),
        s: (s.s + (t.s - f.s)).clamp(0.0, 100.0),
        l: (s.l + (t.l - f.l)).clamp(0.0, 100.0),
        a: s.a,
    }
    .to_rgba()
}

/// Result of palette derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePalette {
    /// Theme rules with every palette color resolved.
    pub style_content: String,
    /// Source literal to the value written into `style_content`.
    pub hybrid_value_map: BTreeMap<String, String>,
    /// Literals forced at every site to their verbatim configured value.
    pub other_values: BTreeMap<String, String>,
    /// Literals forced inside gradients but derived elsewhere.
    ///
    /// Gradient sites of these literals hold the configured value, which the
    /// runtime must leave alone while re-deriving the other sites.
    pub gradient_values: BTreeMap<String, String>,
    /// Canonical source color to the selectors using it.
    pub source_color_map: BTreeMap<String, Vec<String>>,
}

impl ThemePalette {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.style_content.is_empty()
    }
}

/// Derive the theme palette of `css` for the `target` primary color.
///
/// `target` defaults to the configured primary. Only declarations carrying a
/// forced or derived color are kept; duplicate rules are emitted once.
pub fn derive_palette(
    css: &str,
    config: &PaletteConfig,
    target: Option<Rgba>,
) -> PigmentResult<ThemePalette> {
    let target = target.unwrap_or(config.primary);
    let entries = flatten(&parse_stylesheet(css)?);

    let mut palette = ThemePalette::default();
    let mut themed: Vec<FlatEntry> = Vec::new();
    let mut forced: BTreeMap<String, String> = BTreeMap::new();
    let mut derived: BTreeMap<String, String> = BTreeMap::new();

    for entry in entries {
        let FlatItem::Rule {
            selector,
            declarations,
        } = &entry.item
        else {
            continue;
        };

        let mut kept = Vec::new();
        for decl in declarations {
            let matches = find_colors(&decl.value);
            let roles: Vec<ColorRole> = matches.iter().map(|m| config.classify(m)).collect();
            if roles.iter().all(|r| *r == ColorRole::Unrelated) {
                continue;
            }

            for (m, role) in matches.iter().zip(roles.iter()) {
                match role {
                    ColorRole::Unrelated => continue,
                    ColorRole::Forced(value) => {
                        forced.insert(m.raw.to_string(), value.clone());
                    }
                    ColorRole::Derived => {
                        let resolved = derive_color(m.color, config.primary, target).to_css();
                        derived.insert(m.raw.to_string(), resolved);
                    }
                }
                let sites = palette
                    .source_color_map
                    .entry(m.color.to_css())
                    .or_default();
                if !sites.contains(selector) {
                    sites.push(selector.clone());
                }
            }

            let mut roles = roles.into_iter();
            let value = replace_colors(&decl.value, |m| match roles.next() {
                Some(ColorRole::Forced(value)) => value,
                Some(ColorRole::Derived) => derive_color(m.color, config.primary, target).to_css(),
                _ => m.raw.to_string(),
            });
            kept.push(Declaration::new(decl.property.clone(), value));
        }

        if kept.is_empty() {
            continue;
        }
        let candidate = FlatEntry {
            context: entry.context.clone(),
            item: FlatItem::Rule {
                selector: selector.clone(),
                declarations: kept,
            },
        };
        if !themed.contains(&candidate) {
            themed.push(candidate);
        }
    }

    // A literal forced in gradients may still be derived elsewhere.
    for (raw, value) in forced {
        if derived.contains_key(&raw) {
            palette.gradient_values.insert(raw, value);
        } else {
            palette.other_values.insert(raw.clone(), value.clone());
            palette.hybrid_value_map.insert(raw, value);
        }
    }
    palette.hybrid_value_map.extend(derived);

    for sites in palette.source_color_map.values_mut() {
        sites.sort();
    }
    palette.style_content = render_entries(&themed, None);
    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(primary: &str) -> PaletteConfig {
        PaletteConfig::new(primary, HueDiffControls::default(), &[]).unwrap()
    }

    #[test]
    fn test_related_by_hue() {
        let cfg = config("#1890ff");
        assert!(cfg.is_related(Rgba::parse("#1890ff").unwrap()));
        assert!(cfg.is_related(Rgba::parse("rgba(24, 144, 255, 0.2)").unwrap()));
        assert!(!cfg.is_related(Rgba::parse("#f5222d").unwrap()));
        assert!(!cfg.is_related(Rgba::parse("#333").unwrap()));

        let wide = PaletteConfig::new(
            "#1890ff",
            HueDiffControls {
                low: 180.0,
                high: 180.0,
            },
            &[],
        )
        .unwrap();
        assert!(wide.is_related(Rgba::parse("#f5222d").unwrap()));
    }

    #[test]
    fn test_derive_identity_for_default_primary() {
        let source = Rgba::parse("#40a9ff").unwrap();
        let primary = Rgba::parse("#1890ff").unwrap();
        assert_eq!(derive_color(source, primary, primary), source);
    }

    #[test]
    fn test_derive_moves_with_primary() {
        let primary = Rgba::parse("#1890ff").unwrap();
        let red = Rgba::parse("#f5222d").unwrap();
        let derived = derive_color(primary, primary, red);
        assert!(hue_delta(derived.to_hsla().h, red.to_hsla().h).abs() < 1.0);
    }

    #[test]
    fn test_palette_keeps_only_theme_declarations() {
        let css = ".btn{color:#1890ff;margin:0;border:1px solid #d9d9d9}\n.link{color:#333}";
        let palette = derive_palette(css, &config("#1890ff"), None).unwrap();
        assert_eq!(palette.style_content, ".btn{color:#1890ff}");
        assert_eq!(palette.hybrid_value_map.get("#1890ff").unwrap(), "#1890ff");
        assert_eq!(
            palette.source_color_map.get("#1890ff").unwrap(),
            &vec![".btn".to_string()]
        );
        assert!(palette.other_values.is_empty());
    }

    #[test]
    fn test_palette_is_deterministic() {
        let css = ".a{color:#1890ff}\n.b{background:rgba(24,144,255,.5)}\n.a{color:#1890ff}";
        let cfg = config("#1890ff");
        let target = Rgba::parse("#f5222d").ok();
        let first = derive_palette(css, &cfg, target).unwrap();
        let second = derive_palette(css, &cfg, target).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.style_content.matches(".a{").count(), 1);
    }

    #[test]
    fn test_forced_colors_are_never_derived() {
        let cfg = PaletteConfig::new(
            "#1890ff",
            HueDiffControls::default(),
            &[ForcedColor::new("#1890ff", false)],
        )
        .unwrap();
        let target = Rgba::parse("#f5222d").ok();
        let palette = derive_palette(".a{color:#1890FF}", &cfg, target).unwrap();
        assert_eq!(palette.style_content, ".a{color:#1890ff}");
        assert_eq!(palette.other_values.get("#1890FF").unwrap(), "#1890ff");
    }

    #[test]
    fn test_in_gradient_rule_only_applies_in_gradients() {
        let cfg = PaletteConfig::new(
            "#1890ff",
            HueDiffControls::default(),
            &[ForcedColor::new("#ffffff", true)],
        )
        .unwrap();
        let css = ".a{background:linear-gradient(#fff, #1890ff)}\n.b{color:#fff}";
        let palette = derive_palette(css, &cfg, None).unwrap();
        assert_eq!(
            palette.style_content,
            ".a{background:linear-gradient(#ffffff, #1890ff)}"
        );
        assert_eq!(palette.other_values.get("#fff").unwrap(), "#ffffff");
    }

    #[test]
    fn test_gradient_rule_keeps_derived_sites_apart() {
        let cfg = PaletteConfig::new(
            "#1890ff",
            HueDiffControls::default(),
            &[ForcedColor::new("#1890ff", true)],
        )
        .unwrap();
        let css = ".b{color:#1890ff}\n.a{background:linear-gradient(#1890ff, #fff)}";
        let target = Rgba::parse("#f5222d").ok();
        let palette = derive_palette(css, &cfg, target).unwrap();

        assert_eq!(
            palette.style_content,
            ".b{color:#f5222d}\n.a{background:linear-gradient(#1890ff, #fff)}"
        );
        assert_eq!(palette.hybrid_value_map.get("#1890ff").unwrap(), "#f5222d");
        assert_eq!(palette.gradient_values.get("#1890ff").unwrap(), "#1890ff");
        assert!(palette.other_values.is_empty());
    }

    #[test]
    fn test_named_forced_rule_matches_any_spelling() {
        let rules = [ForcedColor::new("white", false), ForcedColor::new("nope", false)];
        let cfg = PaletteConfig::new("#1890ff", HueDiffControls::default(), &rules).unwrap();
        assert_eq!(cfg.forced.len(), 1);

        let css = ".a{color:white}\n.b{border:1px solid #fff}\n.c{color:#333}";
        let palette = derive_palette(css, &cfg, None).unwrap();
        assert_eq!(palette.style_content, ".a{color:white}\n.b{border:1px solid white}");
        assert_eq!(palette.other_values.get("white").unwrap(), "white");
        assert_eq!(palette.other_values.get("#fff").unwrap(), "white");
        assert_eq!(
            palette.source_color_map.get("#ffffff").unwrap(),
            &vec![".a".to_string(), ".b".to_string()]
        );
    }
}
