//! Rule-level stylesheet splitting.
//!
//! Compiled preprocessor output is flat apart from conditional group rules,
//! so a brace-matching splitter is enough: rules with declarations, blocks
//! with nested rules (`@media`, `@supports`, `@keyframes`) and bodiless
//! statements (`@import`, `@charset`). Comments are dropped.

use crate::error::{PigmentError, PigmentResult};

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A selector (or bodied at-rule prelude such as `@font-face`) with declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CssRule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

/// A node of the split stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CssNode {
    Rule(CssRule),
    Block {
        prelude: String,
        children: Vec<CssNode>,
    },
    Statement(String),
}

impl CssNode {
    /// Whether the node is a keyframes block.
    pub fn is_keyframes(&self) -> bool {
        matches!(self, CssNode::Block { prelude, .. } if is_keyframes_prelude(prelude))
    }
}

#[inline]
pub fn is_keyframes_prelude(prelude: &str) -> bool {
    prelude.starts_with('@') && prelude.contains("keyframes")
}

/// Split a stylesheet into nodes.
pub fn parse_stylesheet(css: &str) -> PigmentResult<Vec<CssNode>> {
    let stripped = strip_comments(css);
    parse_nodes(&stripped, 0)
}

fn parse_nodes(src: &str, base_offset: usize) -> PigmentResult<Vec<CssNode>> {
    let bytes = src.as_bytes();
    let mut nodes = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if bytes[pos] == b'}' {
            return Err(PigmentError::UnexpectedClose {
                offset: base_offset + pos,
            });
        }

        let prelude_start = pos;
        let Some(stop) = find_top_level(bytes, pos, |b| b == b'{' || b == b';' || b == b'}') else {
            let rest = normalize_whitespace(&src[prelude_start..]);
            if !rest.is_empty() {
                nodes.push(CssNode::Statement(rest));
            }
            break;
        };

        let prelude = normalize_whitespace(&src[prelude_start..stop]);
        match bytes[stop] {
            b';' => {
                if !prelude.is_empty() {
                    nodes.push(CssNode::Statement(prelude));
                }
                pos = stop + 1;
            }
            b'}' => {
                return Err(PigmentError::UnexpectedClose {
                    offset: base_offset + stop,
                });
            }
            _ => {
                let body_start = stop + 1;
                let close = find_block_end(bytes, body_start).ok_or(
                    PigmentError::UnbalancedBlock {
                        offset: base_offset + stop,
                    },
                )?;
                let body = &src[body_start..close];
                if has_nested_block(body.as_bytes()) {
                    nodes.push(CssNode::Block {
                        prelude,
                        children: parse_nodes(body, base_offset + body_start)?,
                    });
                } else {
                    nodes.push(CssNode::Rule(CssRule {
                        selector: prelude,
                        declarations: parse_declarations(body),
                    }));
                }
                pos = close + 1;
            }
        }
    }

    Ok(nodes)
}

/// Split a rule body into declarations.
pub fn parse_declarations(body: &str) -> Vec<Declaration> {
    let bytes = body.as_bytes();
    let mut declarations = Vec::new();
    let mut start = 0;

    loop {
        let end = find_top_level(bytes, start, |b| b == b';').unwrap_or(bytes.len());
        let chunk = body[start..end].trim();
        if let Some(colon) = chunk.find(':') {
            let property = chunk[..colon].trim();
            let value = normalize_whitespace(&chunk[colon + 1..]);
            if !property.is_empty() {
                declarations.push(Declaration::new(property, value));
            }
        }
        if end >= bytes.len() {
            break;
        }
        start = end + 1;
    }

    declarations
}

/// Render nodes in the compact one-rule-per-line form used for theme output.
pub fn render_nodes(nodes: &[CssNode]) -> String {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_node(node, &mut out);
    }
    out
}

pub fn render_node(node: &CssNode, out: &mut String) {
    match node {
        CssNode::Rule(rule) => render_rule(&rule.selector, &rule.declarations, out),
        CssNode::Block { prelude, children } => {
            out.push_str(prelude);
            out.push_str("{\n");
            out.push_str(&render_nodes(children));
            out.push_str("\n}");
        }
        CssNode::Statement(text) => {
            out.push_str(text);
            out.push(';');
        }
    }
}

pub fn render_rule(selector: &str, declarations: &[Declaration], out: &mut String) {
    out.push_str(selector);
    out.push('{');
    for (i, decl) in declarations.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&decl.property);
        out.push(':');
        out.push_str(&decl.value);
    }
    out.push('}');
}

/// Remove `/* ... */` comments outside of strings.
pub fn strip_comments(css: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[copied..i]);
                let end = css[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(bytes.len());
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&css[copied..]);
    out
}

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Find the first byte matching `stop` outside strings and parentheses.
fn find_top_level<F>(bytes: &[u8], from: usize, stop: F) -> Option<usize>
where
    F: Fn(u8) -> bool,
{
    let mut depth = 0u32;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && stop(b) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `}` matching a block whose body starts at `from`.
fn find_block_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1u32;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn has_nested_block(bytes: &[u8]) -> bool {
    find_top_level(bytes, 0, |b| b == b'{').is_some()
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_rules() {
        let nodes = parse_stylesheet(".a { color: red; margin: 0 }\n.b{color:blue}").unwrap();
        assert_eq!(nodes.len(), 2);
        let CssNode::Rule(rule) = &nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a");
        assert_eq!(
            rule.declarations,
            vec![Declaration::new("color", "red"), Declaration::new("margin", "0")]
        );
    }

    #[test]
    fn test_parse_media_and_statements() {
        let css = "@charset \"utf-8\";\n@media (max-width: 600px) { .a { color: red } }";
        let nodes = parse_stylesheet(css).unwrap();
        assert_eq!(nodes[0], CssNode::Statement("@charset \"utf-8\"".to_string()));
        let CssNode::Block { prelude, children } = &nodes[1] else {
            panic!("expected block");
        };
        assert_eq!(prelude, "@media (max-width: 600px)");
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_strings_and_comments() {
        let css = "/* {x} */ .a::after { content: \"}{;\"; background: url(data:image/png;base64,AAA) }";
        let nodes = parse_stylesheet(css).unwrap();
        let CssNode::Rule(rule) = &nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.declarations[0].value, "\"}{;\"");
        assert_eq!(rule.declarations[1].value, "url(data:image/png;base64,AAA)");
    }

    #[test]
    fn test_unbalanced() {
        assert!(matches!(
            parse_stylesheet(".a { color: red"),
            Err(PigmentError::UnbalancedBlock { .. })
        ));
        assert!(matches!(
            parse_stylesheet(".a { color: red } }"),
            Err(PigmentError::UnexpectedClose { .. })
        ));
    }

    #[test]
    fn test_render_round_trip() {
        let css = "@media screen{\n.a{color:red;margin:0}\n}\n.b{color:blue}";
        let nodes = parse_stylesheet(css).unwrap();
        assert_eq!(render_nodes(&nodes), css);
    }
}
