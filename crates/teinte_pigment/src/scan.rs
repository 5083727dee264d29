//! Color literal scanning inside declaration values.

use crate::color::{parse_color, parse_named_color, Rgba};

/// A color literal found in a declaration value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMatch<'a> {
    /// Byte offset of the literal in the scanned value.
    pub start: usize,
    /// Byte offset one past the literal.
    pub end: usize,
    /// The literal as written.
    pub raw: &'a str,
    /// Parsed color.
    pub color: Rgba,
    /// Whether the literal sits inside a `*-gradient(...)` call.
    pub in_gradient: bool,
}

/// Find every color literal in a declaration value, left to right.
pub fn find_colors(value: &str) -> Vec<ColorMatch<'_>> {
    let bytes = value.as_bytes();
    let mut matches = Vec::new();
    let mut functions: Vec<String> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
            }
            b'#' => {
                let start = i;
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
                    end += 1;
                }
                let len = end - start - 1;
                let bounded = end >= bytes.len() || !is_ident_byte(bytes[end]);
                if bounded && matches!(len, 3 | 4 | 6 | 8) {
                    let raw = &value[start..end];
                    if let Ok(color) = parse_color(raw) {
                        matches.push(ColorMatch {
                            start,
                            end,
                            raw,
                            color,
                            in_gradient: in_gradient(&functions),
                        });
                    }
                }
                i = end.max(i + 1);
            }
            b')' => {
                functions.pop();
                i += 1;
            }
            _ if is_ident_start(b) && (i == 0 || !is_ident_byte(bytes[i - 1])) => {
                let start = i;
                let mut end = i;
                while end < bytes.len() && is_ident_byte(bytes[end]) {
                    end += 1;
                }
                if end < bytes.len() && bytes[end] == b'(' {
                    let name = value[start..end].to_ascii_lowercase();
                    match name.as_str() {
                        "rgb" | "rgba" | "hsl" | "hsla" => {
                            if let Some(close) = find_close_paren(bytes, end + 1) {
                                let raw = &value[start..=close];
                                if let Ok(color) = parse_color(raw) {
                                    matches.push(ColorMatch {
                                        start,
                                        end: close + 1,
                                        raw,
                                        color,
                                        in_gradient: in_gradient(&functions),
                                    });
                                }
                                i = close + 1;
                            } else {
                                i = bytes.len();
                            }
                        }
                        "url" => {
                            i = find_close_paren(bytes, end + 1)
                                .map(|close| close + 1)
                                .unwrap_or(bytes.len());
                        }
                        _ => {
                            functions.push(name);
                            i = end + 1;
                        }
                    }
                } else {
                    let raw = &value[start..end];
                    if let Some(color) = parse_named_color(raw) {
                        matches.push(ColorMatch {
                            start,
                            end,
                            raw,
                            color,
                            in_gradient: in_gradient(&functions),
                        });
                    }
                    i = end;
                }
            }
            b'(' => {
                functions.push(String::new());
                i += 1;
            }
            _ => i += 1,
        }
    }

    matches
}

/// Whether a value contains at least one color literal.
pub fn has_color(value: &str) -> bool {
    !find_colors(value).is_empty()
}

/// Rebuild `value` with every match replaced by `replace(match)`.
pub fn replace_colors<F>(value: &str, mut replace: F) -> String
where
    F: FnMut(&ColorMatch<'_>) -> String,
{
    let matches = find_colors(value);
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for m in &matches {
        out.push_str(&value[last..m.start]);
        out.push_str(&replace(m));
        last = m.end;
    }
    out.push_str(&value[last..]);
    out
}

#[inline]
fn in_gradient(functions: &[String]) -> bool {
    functions.iter().any(|f| f.ends_with("gradient"))
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'-' || b == b'_'
}

#[inline]
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
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

/// Index of the `)` closing a call whose arguments start at `from`.
fn find_close_paren(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1u32;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' => depth += 1,
            b')' => {
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
