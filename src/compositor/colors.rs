//! # TTML 颜色
//!
//! 支持命名颜色、`#rrggbb`、`#rrggbbaa`、`rgb(r,g,b)` 和 `rgba(r,g,b,a)`，
//! 其中 TTML 的 alpha 分量是 0-255 的整数。统一输出为 CSS `rgba()`。

use std::sync::LazyLock;

use regex::Regex;

static RGB_FUNCTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*(\d{1,3})\s*)?\)$")
        .expect("编译 RGB_FUNCTION_REGEX 失败")
});

const NAMED_COLORS: &[(&str, Rgba)] = &[
    ("transparent", Rgba::new(0, 0, 0, 0)),
    ("black", Rgba::opaque(0, 0, 0)),
    ("silver", Rgba::opaque(192, 192, 192)),
    ("gray", Rgba::opaque(128, 128, 128)),
    ("white", Rgba::opaque(255, 255, 255)),
    ("maroon", Rgba::opaque(128, 0, 0)),
    ("red", Rgba::opaque(255, 0, 0)),
    ("purple", Rgba::opaque(128, 0, 128)),
    ("fuchsia", Rgba::opaque(255, 0, 255)),
    ("magenta", Rgba::opaque(255, 0, 255)),
    ("green", Rgba::opaque(0, 128, 0)),
    ("lime", Rgba::opaque(0, 255, 0)),
    ("olive", Rgba::opaque(128, 128, 0)),
    ("yellow", Rgba::opaque(255, 255, 0)),
    ("navy", Rgba::opaque(0, 0, 128)),
    ("blue", Rgba::opaque(0, 0, 255)),
    ("teal", Rgba::opaque(0, 128, 128)),
    ("aqua", Rgba::opaque(0, 255, 255)),
    ("cyan", Rgba::opaque(0, 255, 255)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rgba {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Rgba {
    const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// 解析 TTML 颜色表达式。
    pub(crate) fn parse(value: &str) -> Option<Self> {
        let value = value.trim();

        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }

        if let Some(caps) = RGB_FUNCTION_REGEX.captures(value) {
            let channel = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok());
            let alpha = match caps.get(4) {
                Some(m) => m.as_str().parse::<u8>().ok()?,
                None => 255,
            };
            return Some(Self::new(channel(1)?, channel(2)?, channel(3)?, alpha));
        }

        NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map(|&(_, color)| color)
    }

    pub(crate) fn to_css(self) -> String {
        let alpha = (f64::from(self.a) / 255.0 * 1000.0).round() / 1000.0;
        format!("rgba({},{},{},{alpha})", self.r, self.g, self.b)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { byte(6)? } else { 255 };
    Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, alpha))
}

/// 把 TTML 颜色转换为 CSS 颜色；无法识别时原样返回。
pub(crate) fn color_to_css(value: &str) -> String {
    Rgba::parse(value).map_or_else(|| value.trim().to_owned(), Rgba::to_css)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_colors() {
        assert_eq!(color_to_css("white"), "rgba(255,255,255,1)");
        assert_eq!(color_to_css("Transparent"), "rgba(0,0,0,0)");
        assert_eq!(color_to_css("cyan"), color_to_css("aqua"));
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(color_to_css("#ff0000"), "rgba(255,0,0,1)");
        assert_eq!(color_to_css("#00000080"), "rgba(0,0,0,0.502)");
        assert_eq!(Rgba::parse("#fff"), None);
    }

    #[test]
    fn test_functional_colors() {
        assert_eq!(color_to_css("rgb(1, 2, 3)"), "rgba(1,2,3,1)");
        assert_eq!(color_to_css("rgba(0,0,0,0)"), "rgba(0,0,0,0)");
        assert_eq!(Rgba::parse("rgb(256,0,0)"), None, "超出范围的分量应被拒绝");
    }

    #[test]
    fn test_unknown_colors_pass_through() {
        assert_eq!(color_to_css(" currentColor "), "currentColor");
    }
}
