//! Color literals and HSL math.
//!
//! Only the literal forms a compiled stylesheet actually contains are
//! understood: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()/rgba()` and
//! `hsl()/hsla()` in both comma and space separated syntax, plus the named
//! color keywords, which are resolved through `lightningcss`.

use lightningcss::traits::Parse;
use lightningcss::values::color::CssColor;

use crate::error::{PigmentError, PigmentResult};

/// An sRGB color with straight alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

/// HSL representation. `h` in degrees `[0, 360)`, `s` and `l` in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub a: f64,
}

impl Rgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a color literal.
    pub fn parse(literal: &str) -> PigmentResult<Self> {
        parse_color(literal)
    }

    /// Same color, ignoring tiny alpha differences from rounding.
    pub fn same_as(&self, other: &Rgba) -> bool {
        self.r == other.r
            && self.g == other.g
            && self.b == other.b
            && (self.a - other.a).abs() < 1e-3
    }

    /// `#rrggbb`, alpha dropped.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Canonical CSS text: hex when opaque, `rgba()` otherwise.
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            self.to_hex()
        } else {
            format!(
                "rgba({}, {}, {}, {})",
                self.r,
                self.g,
                self.b,
                format_alpha(self.a)
            )
        }
    }

    pub fn to_hsla(&self) -> Hsla {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if (max - min).abs() < f64::EPSILON {
            return Hsla {
                h: 0.0,
                s: 0.0,
                l: l * 100.0,
                a: self.a,
            };
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsla {
            h: h * 60.0,
            s: s * 100.0,
            l: l * 100.0,
            a: self.a,
        }
    }
}

impl Hsla {
    /// Colors without saturation have no meaningful hue.
    #[inline]
    pub fn is_achromatic(&self) -> bool {
        self.s < 0.5 || self.l <= 0.0 || self.l >= 100.0
    }

    pub fn to_rgba(&self) -> Rgba {
        let h = self.h.rem_euclid(360.0) / 360.0;
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);

        if s == 0.0 {
            let v = channel(l);
            return Rgba::new(v, v, v, self.a);
        }

        let q = if l < 0.5 {
            l * (1.0 + s)
        } else {
            l + s - l * s
        };
        let p = 2.0 * l - q;

        Rgba::new(
            channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            channel(hue_to_rgb(p, q, h)),
            channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
            self.a,
        )
    }
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
fn channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Shortest decimal form with at most three fractional digits.
pub fn format_alpha(a: f64) -> String {
    let text = format!("{:.3}", a.clamp(0.0, 1.0));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Signed shortest distance from `from` to `to` on the hue circle.
pub fn hue_delta(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Parse any supported color literal.
pub fn parse_color(literal: &str) -> PigmentResult<Rgba> {
    let text = literal.trim();
    let invalid = || PigmentError::InvalidColor(literal.to_string());

    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }
    if !text.contains('(') {
        return parse_named_color(text).ok_or_else(invalid);
    }

    let open = text.find('(').ok_or_else(invalid)?;
    if !text.ends_with(')') {
        return Err(invalid());
    }
    let name = text[..open].trim().to_ascii_lowercase();
    let args = split_args(&text[open + 1..text.len() - 1]);

    match name.as_str() {
        "rgb" | "rgba" => parse_rgb_args(&args).ok_or_else(invalid),
        "hsl" | "hsla" => parse_hsl_args(&args).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Resolve a named color keyword such as `white` or `RebeccaPurple`.
///
/// `currentColor` and system colors have no fixed value and yield `None`.
pub fn parse_named_color(name: &str) -> Option<Rgba> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    match CssColor::parse_string(name).ok()? {
        CssColor::RGBA(rgba) => Some(Rgba::new(
            rgba.red,
            rgba.green,
            rgba.blue,
            f64::from(rgba.alpha),
        )),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 | 4 => {
            let r = digit(0)? * 17;
            let g = digit(1)? * 17;
            let b = digit(2)? * 17;
            let a = if hex.len() == 4 {
                (digit(3)? * 17) as f64 / 255.0
            } else {
                1.0
            };
            Some(Rgba::new(r, g, b, a))
        }
        6 | 8 => {
            let a = if hex.len() == 8 {
                pair(6)? as f64 / 255.0
            } else {
                1.0
            };
            Some(Rgba::new(pair(0)?, pair(2)?, pair(4)?, a))
        }
        _ => None,
    }
}

/// Split function arguments on commas, slashes and whitespace.
fn split_args(inner: &str) -> Vec<&str> {
    inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_number(arg: &str) -> Option<f64> {
    arg.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_rgb_channel(arg: &str) -> Option<u8> {
    let value = match arg.strip_suffix('%') {
        Some(pct) => parse_number(pct)? * 2.55,
        None => parse_number(arg)?,
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(arg: Option<&&str>) -> Option<f64> {
    match arg {
        None => Some(1.0),
        Some(arg) => {
            let value = match arg.strip_suffix('%') {
                Some(pct) => parse_number(pct)? / 100.0,
                None => parse_number(arg)?,
            };
            Some(value.clamp(0.0, 1.0))
        }
    }
}

fn parse_rgb_args(args: &[&str]) -> Option<Rgba> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    Some(Rgba::new(
        parse_rgb_channel(args[0])?,
        parse_rgb_channel(args[1])?,
        parse_rgb_channel(args[2])?,
        parse_alpha(args.get(3))?,
    ))
}

fn parse_hsl_args(args: &[&str]) -> Option<Rgba> {
    if args.len() != 3 && args.len() != 4 {
        return None;
    }
    let h = parse_number(args[0].trim_end_matches("deg"))?;
    let s = parse_number(args[1].trim_end_matches('%'))?;
    let l = parse_number(args[2].trim_end_matches('%'))?;
    let a = parse_alpha(args.get(3))?;
    Some(Hsla { h, s, l, a }.to_rgba())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_color("#fff").unwrap(), Rgba::opaque(255, 255, 255));
        assert_eq!(parse_color("#1890FF").unwrap(), Rgba::opaque(24, 144, 255));
        let with_alpha = parse_color("#1890ff80").unwrap();
        assert_eq!(with_alpha.r, 24);
        assert!((with_alpha.a - 128.0 / 255.0).abs() < 1e-9);
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#zzz").is_err());
    }

    #[test]
    fn test_parse_functional_forms() {
        assert_eq!(
            parse_color("rgb(24, 144, 255)").unwrap(),
            Rgba::opaque(24, 144, 255)
        );
        assert_eq!(
            parse_color("rgba(24 144 255 / 50%)").unwrap(),
            Rgba::new(24, 144, 255, 0.5)
        );
        assert_eq!(parse_color("hsl(0, 100%, 50%)").unwrap(), Rgba::opaque(255, 0, 0));
        assert!(parse_color("rgb(1, 2)").is_err());
        assert!(parse_color("calc(1px)").is_err());
    }

    #[test]
    fn test_parse_named_colors() {
        assert_eq!(parse_color("white").unwrap(), Rgba::opaque(255, 255, 255));
        assert_eq!(parse_color("Red").unwrap(), Rgba::opaque(255, 0, 0));
        assert_eq!(parse_color("dodgerblue").unwrap(), Rgba::opaque(30, 144, 255));
        assert_eq!(parse_color("transparent").unwrap().a, 0.0);
        assert!(parse_color("currentColor").is_err());
        assert!(parse_color("solid").is_err());
        assert_eq!(parse_named_color("--red"), None);
    }

    #[test]
    fn test_to_css() {
        assert_eq!(Rgba::opaque(24, 144, 255).to_css(), "#1890ff");
        assert_eq!(Rgba::new(24, 144, 255, 0.2).to_css(), "rgba(24, 144, 255, 0.2)");
        assert_eq!(format_alpha(0.0), "0");
        assert_eq!(format_alpha(0.50), "0.5");
    }

    #[test]
    fn test_hsl_round_trip_is_stable() {
        for color in [
            Rgba::opaque(24, 144, 255),
            Rgba::opaque(245, 34, 45),
            Rgba::opaque(82, 196, 26),
            Rgba::opaque(128, 128, 128),
        ] {
            assert_eq!(color.to_hsla().to_rgba(), color);
        }
    }

    #[test]
    fn test_achromatic() {
        assert!(Rgba::opaque(128, 128, 128).to_hsla().is_achromatic());
        assert!(Rgba::opaque(255, 255, 255).to_hsla().is_achromatic());
        assert!(!Rgba::opaque(24, 144, 255).to_hsla().is_achromatic());
    }

    #[test]
    fn test_hue_delta_wraps() {
        assert_eq!(hue_delta(350.0, 10.0), 20.0);
        assert_eq!(hue_delta(10.0, 350.0), -20.0);
    }
}
