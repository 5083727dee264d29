//! Per-scope theme CSS assembly.
//!
//! A stylesheet compiled once per scope yields structurally identical output
//! whose declarations differ only where scope variables were used. Assembly
//! aligns the outputs rule by rule: declarations equal in every scope stay in
//! the shared stylesheet, the rest become that scope's theme CSS, optionally
//! prefixed with the scope class.

use teinte_carton::FxHashMap;

use crate::css::{
    is_keyframes_prelude, parse_stylesheet, render_node, render_rule, CssNode, Declaration,
};
use crate::error::PigmentResult;
use crate::palette::ForcedColors;

/// A rule or verbatim node together with its enclosing block preludes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlatEntry {
    pub context: Vec<String>,
    pub item: FlatItem,
}

/// Contents of a [`FlatEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlatItem {
    /// Selector rule whose selector can be scoped.
    Rule {
        selector: String,
        declarations: Vec<Declaration>,
    },
    /// Statements, keyframes and bodied at-rules, never rewritten.
    Verbatim(CssNode),
}

impl FlatEntry {
    fn key(&self) -> String {
        let mut key = self.context.join("\u{1}");
        key.push('\u{2}');
        match &self.item {
            FlatItem::Rule { selector, .. } => key.push_str(selector),
            FlatItem::Verbatim(node) => match node {
                CssNode::Statement(text) => key.push_str(text),
                CssNode::Block { prelude, .. } => key.push_str(prelude),
                CssNode::Rule(rule) => key.push_str(&rule.selector),
            },
        }
        key
    }
}

/// Flatten nodes, keeping block preludes as context.
///
/// Keyframes blocks and at-rule bodies like `@font-face` are kept whole.
pub fn flatten(nodes: &[CssNode]) -> Vec<FlatEntry> {
    let mut out = Vec::new();
    flatten_into(nodes, &mut Vec::new(), &mut out);
    out
}

fn flatten_into(nodes: &[CssNode], context: &mut Vec<String>, out: &mut Vec<FlatEntry>) {
    for node in nodes {
        match node {
            CssNode::Block { prelude, children } if !is_keyframes_prelude(prelude) => {
                context.push(prelude.clone());
                flatten_into(children, context, out);
                context.pop();
            }
            CssNode::Rule(rule) if !rule.selector.starts_with('@') => out.push(FlatEntry {
                context: context.clone(),
                item: FlatItem::Rule {
                    selector: rule.selector.clone(),
                    declarations: rule.declarations.clone(),
                },
            }),
            _ => out.push(FlatEntry {
                context: context.clone(),
                item: FlatItem::Verbatim(node.clone()),
            }),
        }
    }
}

/// Render flat entries, re-opening blocks for runs sharing a context.
///
/// `scope` prefixes every rule selector with that scope class.
pub fn render_entries(entries: &[FlatEntry], scope: Option<&str>) -> String {
    let mut out = String::new();
    let mut open: Vec<String> = Vec::new();

    for entry in entries {
        let shared = open
            .iter()
            .zip(entry.context.iter())
            .take_while(|(a, b)| a == b)
            .count();
        while open.len() > shared {
            open.pop();
            out.push_str("\n}");
        }
        for prelude in &entry.context[shared..] {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(prelude);
            out.push('{');
            open.push(prelude.clone());
        }

        if !out.is_empty() {
            out.push('\n');
        }
        match &entry.item {
            FlatItem::Rule {
                selector,
                declarations,
            } => match scope {
                Some(scope) => render_rule(&scope_selector(selector, scope), declarations, &mut out),
                None => render_rule(selector, declarations, &mut out),
            },
            FlatItem::Verbatim(node) => render_node(node, &mut out),
        }
    }
    while open.pop().is_some() {
        out.push_str("\n}");
    }
    out
}

/// Prefix every selector of a selector list with `.scope`.
///
/// `:root` and `html` selectors receive the class directly since the scope
/// class lives on the document element.
pub fn scope_selector(selector_list: &str, scope: &str) -> String {
    split_selector_list(selector_list)
        .into_iter()
        .map(|part| scope_single_selector(part, scope))
        .collect::<Vec<_>>()
        .join(",")
}

fn scope_single_selector(selector: &str, scope: &str) -> String {
    let selector = selector.trim();
    for root in [":root", "html"] {
        if let Some(rest) = selector.strip_prefix(root) {
            let boundary = rest
                .bytes()
                .next()
                .map_or(true, |b| !(b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
            if boundary {
                let mut out = String::with_capacity(selector.len() + scope.len() + 1);
                out.push_str(root);
                out.push('.');
                out.push_str(scope);
                out.push_str(rest);
                return out;
            }
        }
    }
    let mut out = String::with_capacity(selector.len() + scope.len() + 2);
    out.push('.');
    out.push_str(scope);
    out.push(' ');
    out.push_str(selector);
    out
}

/// Split on commas that are not nested in parentheses or brackets.
fn split_selector_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0u32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Output of per-scope assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedCss {
    /// Scope names in input order.
    pub scopes: Vec<String>,
    /// Entries identical in every scope.
    pub common: Vec<FlatEntry>,
    /// Entries specific to each scope, parallel to `scopes`.
    pub themes: Vec<Vec<FlatEntry>>,
}

impl ScopedCss {
    /// Align per-scope compiled outputs.
    ///
    /// Declarations containing a forced color always count as theme
    /// declarations, even when every scope agrees on them.
    pub fn assemble(outputs: &[(String, String)], forced: &ForcedColors) -> PigmentResult<Self> {
        let mut per_scope: Vec<Vec<FlatEntry>> = Vec::with_capacity(outputs.len());
        for (_, css) in outputs {
            per_scope.push(flatten(&parse_stylesheet(css)?));
        }

        let scope_count = outputs.len();
        let mut order: Vec<String> = Vec::new();
        let mut slots: FxHashMap<String, Vec<Option<FlatEntry>>> = FxHashMap::default();
        for (scope_idx, entries) in per_scope.into_iter().enumerate() {
            let mut seen: FxHashMap<String, usize> = FxHashMap::default();
            for entry in entries {
                let base = entry.key();
                let occurrence = seen.entry(base.clone()).or_insert(0);
                let key = format!("{}\u{3}{}", base, occurrence);
                *occurrence += 1;
                let slot = slots.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    vec![None; scope_count]
                });
                slot[scope_idx] = Some(entry);
            }
        }

        let mut result = ScopedCss {
            scopes: outputs.iter().map(|(name, _)| name.clone()).collect(),
            common: Vec::new(),
            themes: vec![Vec::new(); scope_count],
        };

        for key in &order {
            let Some(slot) = slots.remove(key) else {
                continue;
            };
            if slot.iter().any(Option::is_none) {
                for (idx, entry) in slot.into_iter().enumerate() {
                    if let Some(entry) = entry {
                        result.themes[idx].push(entry);
                    }
                }
                continue;
            }
            let entries: Vec<FlatEntry> = slot.into_iter().flatten().collect();
            result.split_entry(entries, forced);
        }

        Ok(result)
    }

    fn split_entry(&mut self, entries: Vec<FlatEntry>, forced: &ForcedColors) {
        let first = &entries[0];
        let FlatItem::Rule {
            selector,
            declarations,
        } = &first.item
        else {
            if entries.iter().all(|e| e.item == first.item) {
                self.common.push(first.clone());
            } else {
                for (idx, entry) in entries.into_iter().enumerate() {
                    self.themes[idx].push(entry);
                }
            }
            return;
        };

        let decl_lists: Vec<&Vec<Declaration>> = entries
            .iter()
            .map(|e| match &e.item {
                FlatItem::Rule { declarations, .. } => declarations,
                FlatItem::Verbatim(_) => declarations,
            })
            .collect();
        let aligned = decl_lists.iter().all(|list| {
            list.len() == declarations.len()
                && list
                    .iter()
                    .zip(declarations.iter())
                    .all(|(a, b)| a.property == b.property)
        });

        let mut common = Vec::new();
        let mut themed: Vec<Vec<Declaration>> = vec![Vec::new(); entries.len()];
        if aligned {
            for (i, decl) in declarations.iter().enumerate() {
                let agree = decl_lists.iter().all(|list| list[i].value == decl.value);
                if agree && !forced.matches_value(&decl.value) {
                    common.push(decl.clone());
                } else {
                    for (idx, list) in decl_lists.iter().enumerate() {
                        themed[idx].push(list[i].clone());
                    }
                }
            }
        } else {
            for (idx, list) in decl_lists.iter().enumerate() {
                themed[idx].extend(list.iter().cloned());
            }
        }

        if !common.is_empty() {
            self.common.push(FlatEntry {
                context: first.context.clone(),
                item: FlatItem::Rule {
                    selector: selector.clone(),
                    declarations: common,
                },
            });
        }
        for (idx, declarations) in themed.into_iter().enumerate() {
            if declarations.is_empty() {
                continue;
            }
            let entry = &entries[idx];
            let selector = match &entry.item {
                FlatItem::Rule { selector, .. } => selector.clone(),
                FlatItem::Verbatim(_) => selector.clone(),
            };
            self.themes[idx].push(FlatEntry {
                context: entry.context.clone(),
                item: FlatItem::Rule {
                    selector,
                    declarations,
                },
            });
        }
    }

    /// Position of a scope by name.
    pub fn scope_index(&self, scope: &str) -> Option<usize> {
        self.scopes.iter().position(|s| s == scope)
    }

    /// CSS shared by all scopes.
    pub fn common_css(&self) -> String {
        render_entries(&self.common, None)
    }

    /// Theme CSS of one scope, with or without the scope class prefix.
    pub fn theme_css(&self, scope: &str, with_scope_name: bool) -> Option<String> {
        let idx = self.scope_index(scope)?;
        let prefix = with_scope_name.then_some(scope);
        Some(render_entries(&self.themes[idx], prefix))
    }

    /// Shared CSS followed by every scope's prefixed theme CSS.
    pub fn combined_css(&self) -> String {
        let mut parts = Vec::with_capacity(self.scopes.len() + 1);
        let common = self.common_css();
        if !common.is_empty() {
            parts.push(common);
        }
        for (idx, scope) in self.scopes.iter().enumerate() {
            let theme = render_entries(&self.themes[idx], Some(scope));
            if !theme.is_empty() {
                parts.push(theme);
            }
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_scope_selector() {
        assert_eq!(scope_selector(".btn", "theme-1"), ".theme-1 .btn");
        assert_eq!(
            scope_selector(".a, .b:hover", "dark"),
            ".dark .a,.dark .b:hover"
        );
        assert_eq!(scope_selector(":root", "dark"), ":root.dark");
        assert_eq!(scope_selector("html body", "dark"), "html.dark body");
        assert_eq!(scope_selector("header", "dark"), ".dark header");
        assert_eq!(scope_selector(":is(.a, .b) p", "dark"), ".dark :is(.a, .b) p");
    }

    #[test]
    fn test_assemble_splits_common_and_theme() {
        let scoped = ScopedCss::assemble(
            &outputs(&[
                ("theme-1", ".btn{color:#1890ff;margin:0}"),
                ("theme-2", ".btn{color:#f5222d;margin:0}"),
            ]),
            &ForcedColors::default(),
        )
        .unwrap();

        assert_eq!(scoped.common_css(), ".btn{margin:0}");
        assert_eq!(
            scoped.theme_css("theme-1", true).unwrap(),
            ".theme-1 .btn{color:#1890ff}"
        );
        assert_eq!(scoped.theme_css("theme-2", false).unwrap(), ".btn{color:#f5222d}");
        insta::assert_snapshot!(scoped.combined_css(), @r"
        .btn{margin:0}
        .theme-1 .btn{color:#1890ff}
        .theme-2 .btn{color:#f5222d}
        ");
    }

    #[test]
    fn test_assemble_keeps_media_context() {
        let scoped = ScopedCss::assemble(
            &outputs(&[
                ("a", "@media (min-width: 1px){.x{color:#111}}"),
                ("b", "@media (min-width: 1px){.x{color:#222}}"),
            ]),
            &ForcedColors::default(),
        )
        .unwrap();
        assert!(scoped.common.is_empty());
        assert_eq!(
            scoped.theme_css("b", true).unwrap(),
            "@media (min-width: 1px){\n.b .x{color:#222}\n}"
        );
    }

    #[test]
    fn test_forced_color_is_theme_even_when_equal() {
        let forced = ForcedColors::new(&[crate::palette::ForcedColor::new("#ffffff", false)]);
        let scoped = ScopedCss::assemble(
            &outputs(&[
                ("a", ".x{background:#fff;color:#111}"),
                ("b", ".x{background:#fff;color:#111}"),
            ]),
            &forced,
        )
        .unwrap();
        assert_eq!(scoped.common_css(), ".x{color:#111}");
        assert_eq!(scoped.theme_css("a", true).unwrap(), ".a .x{background:#fff}");
    }

    #[test]
    fn test_rules_missing_in_a_scope_become_theme() {
        let scoped = ScopedCss::assemble(
            &outputs(&[("a", ".x{color:#111}\n.y{color:#222}"), ("b", ".x{color:#111}")]),
            &ForcedColors::default(),
        )
        .unwrap();
        assert_eq!(scoped.common_css(), ".x{color:#111}");
        assert_eq!(scoped.theme_css("a", false).unwrap(), ".y{color:#222}");
        assert_eq!(scoped.theme_css("b", false).unwrap(), "");
    }
}
