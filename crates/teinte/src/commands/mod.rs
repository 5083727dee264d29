//! Subcommands of the `teinte` binary.

pub mod extract;
pub mod install;
pub mod palette;
pub mod reset;

use teinte_atelier::StyleLang;

/// Parse `less`, `scss` or `sass`.
pub fn parse_lang(value: &str) -> Result<StyleLang, String> {
    StyleLang::parse(value).ok_or_else(|| format!("unknown style language `{value}`"))
}
