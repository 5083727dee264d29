//! HTML tags injected into the index page.

use std::collections::BTreeMap;

use serde::Serialize;
use teinte_carton::path::posix_join;

use crate::extract::{theme_asset_name, theme_output_dir};
use crate::options::{InjectTo, StyleTagInjection};
use crate::session::ThemeSession;

/// A tag descriptor handed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlTag {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<String>,
    pub inject_to: InjectTo,
}

impl HtmlTag {
    pub fn new(tag: impl Into<String>, inject_to: InjectTo) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: None,
            inject_to,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn children(mut self, children: impl Into<String>) -> Self {
        self.children = Some(children.into());
        self
    }

    /// Serialize the tag. Tags without children are void elements.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        if let Some(children) = &self.children {
            out.push_str(children);
            out.push_str("</");
            out.push_str(&self.tag);
            out.push('>');
        }
        out
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// First-paint `<style>` tag of arbitrary mode.
pub fn theme_style_tag(session: &ThemeSession, style_content: &str) -> Option<HtmlTag> {
    let options = session.options();
    if !options.arbitrary_mode || style_content.is_empty() {
        return None;
    }
    let inject_to = match options.inject_default_style_tag_to_html {
        StyleTagInjection::Disabled => return None,
        StyleTagInjection::Head if session.is_build() => InjectTo::HeadPrepend,
        _ => InjectTo::Body,
    };
    Some(
        HtmlTag::new("style", inject_to)
            .attr("id", &options.style_tag_id)
            .attr("type", "text/css")
            .children(style_content),
    )
}

/// `<link>` to the default scope's extracted theme file.
pub fn theme_link_tag(session: &ThemeSession, base: &str, assets_dir: &str) -> Option<HtmlTag> {
    if !session.extract_enabled() {
        return None;
    }
    let scope = session.default_scope()?;
    let dir = theme_output_dir(session, assets_dir);
    let file = theme_asset_name(session, &scope, dir);
    let href = posix_join([base, file.as_str()]);
    let options = session.options();
    Some(
        HtmlTag::new("link", options.theme_link_tag_inject_to)
            .attr("rel", "stylesheet")
            .attr("href", href)
            .attr("id", &options.theme_link_tag_id),
    )
}

/// Insert tags into a document at their injection points.
///
/// Missing `<head>`/`<body>` fall back to the start or the end of the
/// document.
pub fn inject_tags(html: &str, tags: &[HtmlTag]) -> String {
    let mut out = html.to_string();
    for inject_to in [
        InjectTo::HeadPrepend,
        InjectTo::Head,
        InjectTo::BodyPrepend,
        InjectTo::Body,
    ] {
        let fragment: Vec<String> = tags
            .iter()
            .filter(|tag| tag.inject_to == inject_to)
            .map(HtmlTag::to_html)
            .collect();
        if fragment.is_empty() {
            continue;
        }
        out = insert_fragment(&out, inject_to, &fragment.join("\n"));
    }
    out
}

fn insert_fragment(html: &str, inject_to: InjectTo, fragment: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let position = match inject_to {
        InjectTo::Head => lower.find("</head>"),
        InjectTo::Body => lower.rfind("</body>"),
        InjectTo::HeadPrepend => open_tag_end(&lower, "<head"),
        InjectTo::BodyPrepend => open_tag_end(&lower, "<body"),
    };
    let position = position.unwrap_or(match inject_to {
        InjectTo::Head | InjectTo::HeadPrepend => 0,
        InjectTo::Body | InjectTo::BodyPrepend => html.len(),
    });
    let mut out = String::with_capacity(html.len() + fragment.len());
    out.push_str(&html[..position]);
    out.push_str(fragment);
    out.push_str(&html[position..]);
    out
}

/// Byte offset just past the opening tag `name` (like `<head`).
fn open_tag_end(lower: &str, name: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = lower[from..].find(name) {
        let start = from + found;
        let after = start + name.len();
        match lower.as_bytes().get(after) {
            Some(b'>') => return Some(after + 1),
            Some(b) if b.is_ascii_whitespace() => {
                return lower[after..].find('>').map(|end| after + end + 1);
            }
            _ => from = after,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ScopeVarConfig, ThemeOptions};
    use crate::registry::ScopeRegistry;
    use crate::session::{BuildCommand, SessionBuilder};

    fn session(options: ThemeOptions, command: BuildCommand) -> std::sync::Arc<ThemeSession> {
        let mut registry = ScopeRegistry::new();
        registry.register(&ScopeVarConfig::new("light", ["l.less"]));
        registry.register(&ScopeVarConfig::new("dark", ["d.less"]));
        SessionBuilder::new(options)
            .registry(registry)
            .command(command)
            .build()
    }

    fn arbitrary(injection: StyleTagInjection) -> ThemeOptions {
        ThemeOptions {
            arbitrary_mode: true,
            inject_default_style_tag_to_html: injection,
            ..Default::default()
        }
    }

    #[test]
    fn test_style_tag_placement() {
        let build = session(arbitrary(StyleTagInjection::Head), BuildCommand::Build);
        let tag = theme_style_tag(&build, ".a{color:red}").unwrap();
        assert_eq!(tag.inject_to, InjectTo::HeadPrepend);
        assert_eq!(
            tag.to_html(),
            r#"<style id="custom-theme-tagid" type="text/css">.a{color:red}</style>"#
        );

        let serve = session(arbitrary(StyleTagInjection::Head), BuildCommand::Serve);
        assert_eq!(theme_style_tag(&serve, ".a{}").unwrap().inject_to, InjectTo::Body);

        let disabled = session(arbitrary(StyleTagInjection::Disabled), BuildCommand::Build);
        assert!(theme_style_tag(&disabled, ".a{}").is_none());
        assert!(theme_style_tag(&build, "").is_none());
    }

    #[test]
    fn test_link_tag() {
        let build = session(
            ThemeOptions {
                default_scope_name: "dark".to_string(),
                ..Default::default()
            },
            BuildCommand::Build,
        );
        let tag = theme_link_tag(&build, "/app/", "assets").unwrap();
        assert_eq!(
            tag.to_html(),
            r#"<link href="/app/assets/dark.css" id="theme-link-tag" rel="stylesheet">"#
        );
        assert_eq!(tag.inject_to, InjectTo::Head);

        let serve = session(ThemeOptions::default(), BuildCommand::Serve);
        assert!(theme_link_tag(&serve, "/", "assets").is_none());
    }

    #[test]
    fn test_inject_tags() {
        let html = "<html><HEAD><title>x</title></HEAD><body class=\"a\"><div></div></body></html>";
        let tags = vec![
            HtmlTag::new("link", InjectTo::Head).attr("rel", "x"),
            HtmlTag::new("meta", InjectTo::HeadPrepend),
            HtmlTag::new("style", InjectTo::Body).children("b"),
            HtmlTag::new("i", InjectTo::BodyPrepend).children(""),
        ];
        assert_eq!(
            inject_tags(html, &tags),
            "<html><HEAD><meta><title>x</title><link rel=\"x\"></HEAD><body class=\"a\"><i></i><div></div><style>b</style></body></html>"
        );
    }

    #[test]
    fn test_attr_escaping() {
        let tag = HtmlTag::new("link", InjectTo::Head).attr("href", "a\"b&c");
        assert_eq!(tag.to_html(), "<link href=\"a&quot;b&amp;c\">");
    }
}
