//! # 样式翻译
//!
//! 把层叠后的 TTML 样式属性翻译为 CSS 属性。
//! 长度统一经过 [`UnitResolver`] 换算，颜色统一经过 [`color_to_css`] 换算。

use std::collections::BTreeMap;

use tracing::warn;

use super::{
    colors::{Rgba, color_to_css},
    units::{Axis, Length, UnitResolver, split_length},
};
use crate::{
    parser::{state::StyleSet, styles::StyleProperty},
    settings::Dimensions,
};

/// 描边阴影环的最大半径，对应 `(2 × 10 + 1)² − 1 = 440` 层阴影。
pub(crate) const MAX_OUTLINE_RADIUS: i64 = 10;

/// CSS 属性名到值的映射。
pub(crate) type CssMap = BTreeMap<String, String>;

/// 翻译时需要的上下文。
pub(crate) struct Translator<'a> {
    pub(crate) font_map: &'a BTreeMap<String, String>,
    pub(crate) units: UnitResolver,
    /// 百分比几何长度的包含框；`None` 表示视口。
    pub(crate) containing: Option<Dimensions>,
}

impl Translator<'_> {
    /// 翻译 `styles` 中的所有属性。`styles` 同时用作查询关联属性（例如描边颜色）的上下文。
    pub(crate) fn translate_all(&self, styles: &StyleSet) -> CssMap {
        let mut css = CssMap::new();
        for (name, value) in styles {
            self.translate(name, value, styles, &mut css);
        }
        css
    }

    pub(crate) fn translate(&self, name: &str, value: &str, context: &StyleSet, css: &mut CssMap) {
        let value = value.trim();
        let Ok(property) = name.parse::<StyleProperty>() else {
            css.insert(kebab_case(name), value.to_owned());
            return;
        };

        match property {
            StyleProperty::BackgroundColor => put(css, "background-color", color_to_css(value)),
            StyleProperty::Color => put(css, "color", color_to_css(value)),
            StyleProperty::Direction => put(css, "direction", value),
            StyleProperty::Display => {
                if value == "none" {
                    put(css, "display", "none");
                }
            }
            StyleProperty::DisplayAlign | StyleProperty::ShowBackground => {}
            StyleProperty::Extent => self.translate_pair(value, ("width", "height"), "100%", css),
            StyleProperty::FontFamily => put(css, "font-family", self.font_family(value)),
            StyleProperty::FontSize => {
                if let Some(length) = value
                    .split_whitespace()
                    .next()
                    .and_then(|t| self.units.length(t, Axis::Horizontal))
                {
                    put(css, "font-size", length.to_css());
                }
            }
            StyleProperty::FontStyle => put(css, "font-style", value),
            StyleProperty::FontWeight => put(css, "font-weight", value),
            StyleProperty::LineHeight => {
                if value == "normal" {
                    put(css, "line-height", "normal");
                } else if let Some(length) = self.units.length(value, Axis::Vertical) {
                    put(css, "line-height", length.to_css());
                }
            }
            StyleProperty::Opacity => put(css, "opacity", value),
            StyleProperty::Origin => self.translate_pair(value, ("left", "top"), "0px", css),
            StyleProperty::Overflow => put(css, "overflow", value),
            StyleProperty::Padding => {
                if let Some(padding) = self.padding(value) {
                    put(css, "padding", padding);
                }
            }
            StyleProperty::TextAlign => put(css, "text-align", value),
            StyleProperty::TextDecoration => put(css, "text-decoration", text_decoration(value)),
            StyleProperty::TextOutline => {
                if let Some(shadow) = self.text_outline(value, context) {
                    put(css, "text-shadow", shadow);
                }
            }
            StyleProperty::UnicodeBidi => {
                let bidi = match value {
                    "bidiOverride" => "bidi-override",
                    other => other,
                };
                put(css, "unicode-bidi", bidi);
            }
            StyleProperty::Visibility => put(css, "visibility", value),
            StyleProperty::WrapOption => {
                let white_space = if value == "noWrap" { "nowrap" } else { "normal" };
                put(css, "white-space", white_space);
            }
            StyleProperty::WritingMode => {
                let mode = match value {
                    "tbrl" | "tb" => "vertical-rl",
                    "tblr" => "vertical-lr",
                    _ => "horizontal-tb",
                };
                put(css, "writing-mode", mode);
            }
            StyleProperty::ZIndex => put(css, "z-index", value),
        }
    }

    fn containing_dimension(&self, axis: Axis) -> Option<f64> {
        self.containing.map(|d| match axis {
            Axis::Horizontal => d.width,
            Axis::Vertical => d.height,
        })
    }

    fn geometry(&self, token: &str, axis: Axis) -> Option<Length> {
        self.units
            .absolute_length(token, axis, self.containing_dimension(axis))
    }

    /// 把 `"<h> <v>"` 形式的值翻译为两个 CSS 属性；`auto` 使用 `auto_value`。
    fn translate_pair(
        &self,
        value: &str,
        (horizontal, vertical): (&str, &str),
        auto_value: &str,
        css: &mut CssMap,
    ) {
        if value == "auto" {
            put(css, horizontal, auto_value);
            put(css, vertical, auto_value);
            return;
        }
        let mut tokens = value.split_whitespace();
        let (Some(h), Some(v)) = (tokens.next(), tokens.next()) else {
            return;
        };
        if let (Some(h), Some(v)) = (
            self.geometry(h, Axis::Horizontal),
            self.geometry(v, Axis::Vertical),
        ) {
            put(css, horizontal, h.to_css());
            put(css, vertical, v.to_css());
        }
    }

    /// TTML 的内边距顺序为 before、end、after、start，对应横排时的上、右、下、左。
    fn padding(&self, value: &str) -> Option<String> {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        let (top, right, bottom, left) = match tokens.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return None,
        };
        let parts = [
            self.geometry(top, Axis::Vertical)?,
            self.geometry(right, Axis::Horizontal)?,
            self.geometry(bottom, Axis::Vertical)?,
            self.geometry(left, Axis::Horizontal)?,
        ];
        Some(
            parts
                .into_iter()
                .map(Length::to_css)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    fn font_family(&self, value: &str) -> String {
        value
            .split(',')
            .map(|family| family.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|family| !family.is_empty())
            .map(|family| match self.font_map.get(family) {
                Some(mapped) => mapped.clone(),
                None if family.contains(char::is_whitespace) => format!("\"{family}\""),
                None => family.to_owned(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `[<颜色>] <粗细> [<模糊半径>]`，颜色缺省时使用文本颜色。
    fn text_outline(&self, value: &str, context: &StyleSet) -> Option<String> {
        if value == "none" {
            return None;
        }
        let mut tokens = value.split_whitespace().peekable();
        let color = match tokens.peek() {
            Some(first) if split_length(first).is_none() => {
                let color = color_to_css(first);
                tokens.next();
                color
            }
            _ => context
                .get("color")
                .and_then(|c| Rgba::parse(c))
                .map_or_else(|| "currentColor".to_owned(), Rgba::to_css),
        };

        let thickness = self.outline_length(tokens.next()?)?;
        let blur = tokens
            .next()
            .and_then(|t| self.outline_length(t))
            .unwrap_or(0.0);

        let mut radius = thickness.round() as i64;
        if radius > MAX_OUTLINE_RADIUS {
            warn!(radius, max = MAX_OUTLINE_RADIUS, "描边过粗，已截断");
            radius = MAX_OUTLINE_RADIUS;
        }
        let shadows = outline_shadows(radius, blur, &color);
        (!shadows.is_empty()).then(|| shadows.join(", "))
    }

    fn outline_length(&self, token: &str) -> Option<f64> {
        self.units.length(token, Axis::Vertical)?.as_px()
    }
}

/// 生成描边的阴影环：`[-r, r] × [-r, r]` 中除 `(0, 0)` 以外的每个偏移各一层，
/// 共 `(2r + 1)² − 1` 层。
pub(crate) fn outline_shadows(radius: i64, blur: f64, color: &str) -> Vec<String> {
    if radius <= 0 {
        return Vec::new();
    }
    let mut shadows = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            shadows.push(format!("{dx}px {dy}px {blur}px {color}"));
        }
    }
    shadows
}

fn text_decoration(value: &str) -> String {
    let lines: Vec<&str> = value
        .split_whitespace()
        .filter_map(|token| match token {
            "underline" => Some("underline"),
            "lineThrough" => Some("line-through"),
            "overline" => Some("overline"),
            _ => None,
        })
        .collect();
    if lines.is_empty() {
        "none".to_owned()
    } else {
        lines.join(" ")
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn put(css: &mut CssMap, name: &str, value: impl Into<String>) {
    css.insert(name.to_owned(), value.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CellResolution, Settings};

    fn translate(styles: &[(&str, &str)]) -> CssMap {
        let settings = Settings::default();
        let translator = Translator {
            font_map: &settings.font_map,
            units: UnitResolver::new(
                Dimensions::new(640.0, 360.0),
                CellResolution::default(),
                None,
            ),
            containing: None,
        };
        let set: StyleSet = styles
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        translator.translate_all(&set)
    }

    #[test]
    fn test_cell_font_size() {
        let css = translate(&[("fontSize", "1c")]);
        assert_eq!(css["font-size"], "20px");
    }

    #[test]
    fn test_percentage_font_size_is_relative() {
        let css = translate(&[("fontSize", "150%")]);
        assert_eq!(css["font-size"], "150%");
    }

    #[test]
    fn test_region_geometry() {
        let css = translate(&[("origin", "10% 80%"), ("extent", "80% 10%")]);
        assert_eq!(css["left"], "64px");
        assert_eq!(css["top"], "288px");
        assert_eq!(css["width"], "512px");
        assert_eq!(css["height"], "36px");

        let css = translate(&[("origin", "auto"), ("extent", "auto")]);
        assert_eq!(css["left"], "0px");
        assert_eq!(css["width"], "100%");
    }

    #[test]
    fn test_padding_expands_to_four_sides() {
        let css = translate(&[("padding", "1c 10%")]);
        assert_eq!(css["padding"], "24px 64px 24px 64px");
    }

    #[test]
    fn test_text_outline_ring_has_eight_layers_at_radius_one() {
        let css = translate(&[("textOutline", "black 1px")]);
        let layers: Vec<&str> = css["text-shadow"].split(", ").collect();
        assert_eq!(layers.len(), 8);
        assert!(layers.contains(&"-1px -1px 0px rgba(0,0,0,1)"));
        assert!(!layers.iter().any(|l| l.starts_with("0px 0px")));
    }

    #[test]
    fn test_text_outline_ring_size() {
        assert_eq!(outline_shadows(2, 0.0, "red").len(), 24);
        assert!(outline_shadows(0, 0.0, "red").is_empty());
    }

    #[test]
    fn test_text_outline_radius_is_capped() {
        let css = translate(&[("textOutline", "black 100000px")]);
        let layers = css["text-shadow"].split(", ").count();
        let side = 2 * MAX_OUTLINE_RADIUS + 1;
        assert_eq!(layers as i64, side * side - 1);
        assert!(css["text-shadow"].starts_with("-10px -10px 0px"));
    }

    #[test]
    fn test_text_outline_defaults_to_text_color() {
        let css = translate(&[("color", "yellow"), ("textOutline", "1px")]);
        assert!(css["text-shadow"].ends_with("rgba(255,255,0,1)"));
    }

    #[test]
    fn test_keyword_translations() {
        let css = translate(&[
            ("fontFamily", "proportionalSansSerif, My Font"),
            ("textDecoration", "underline lineThrough"),
            ("unicodeBidi", "bidiOverride"),
            ("wrapOption", "noWrap"),
            ("writingMode", "tbrl"),
            ("display", "auto"),
        ]);
        assert_eq!(css["font-family"], "Arial, Helvetica, sans-serif, \"My Font\"");
        assert_eq!(css["text-decoration"], "underline line-through");
        assert_eq!(css["unicode-bidi"], "bidi-override");
        assert_eq!(css["white-space"], "nowrap");
        assert_eq!(css["writing-mode"], "vertical-rl");
        assert!(!css.contains_key("display"));
    }

    #[test]
    fn test_unknown_properties_pass_through() {
        let css = translate(&[("fontKerning", "none")]);
        assert_eq!(css["font-kerning"], "none");
    }
}
