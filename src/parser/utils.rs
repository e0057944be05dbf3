//! # TTML 解析器的工具函数

use crate::{
    document::{Document, NodeId},
    settings::Dimensions,
};

/// 获取元素上的属性值。节点不是元素时返回 `None`。
pub(super) fn get_attribute<'a>(
    doc: &'a Document,
    node: NodeId,
    namespace: Option<&str>,
    local_name: &str,
) -> Option<&'a str> {
    doc.element(node)?.attribute(namespace, local_name)
}

/// 获取无命名空间的 TTML 属性（`begin`、`region`、`style` 等），空值视为不存在。
pub(super) fn get_plain_attribute<'a>(
    doc: &'a Document,
    node: NodeId,
    local_name: &str,
) -> Option<&'a str> {
    get_attribute(doc, node, None, local_name).filter(|v| !v.trim().is_empty())
}

/// 解析 `"<a> <b>"` 形式的两个正整数，例如 `ttp:cellResolution="32 15"`。
pub(super) fn parse_integer_pair(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.split_whitespace();
    let first = parts.next()?.parse().ok()?;
    let second = parts.next()?.parse().ok()?;
    if parts.next().is_some() || first == 0 || second == 0 {
        return None;
    }
    Some((first, second))
}

/// 解析 `"<w>px <h>px"` 形式的像素尺寸，例如 `tts:extent="1280px 720px"`。
pub(super) fn parse_pixel_extent(value: &str) -> Option<Dimensions> {
    let mut parts = value.split_whitespace();
    let width = parse_pixels(parts.next()?)?;
    let height = parse_pixels(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(Dimensions::new(width, height))
}

fn parse_pixels(token: &str) -> Option<f64> {
    let value: f64 = token.strip_suffix("px")?.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// 解析一个正的浮点数参数。
pub(super) fn parse_positive_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_pair() {
        assert_eq!(parse_integer_pair("32 15"), Some((32, 15)));
        assert_eq!(parse_integer_pair("  40   20 "), Some((40, 20)));
        assert_eq!(parse_integer_pair("32"), None);
        assert_eq!(parse_integer_pair("32 15 1"), None);
        assert_eq!(parse_integer_pair("0 15"), None);
        assert_eq!(parse_integer_pair("a b"), None);
    }

    #[test]
    fn test_parse_pixel_extent() {
        assert_eq!(
            parse_pixel_extent("1280px 720px"),
            Some(Dimensions::new(1280.0, 720.0))
        );
        assert_eq!(parse_pixel_extent("100% 100%"), None);
        assert_eq!(parse_pixel_extent("1280px"), None);
    }

    #[test]
    fn test_parse_positive_number() {
        assert_eq!(parse_positive_number("25"), Some(25.0));
        assert_eq!(parse_positive_number("29.97"), Some(29.97));
        assert_eq!(parse_positive_number("0"), None);
        assert_eq!(parse_positive_number("-3"), None);
    }
}
