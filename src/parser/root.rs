//! # TTML 解析器 - 根元素处理
//!
//! 校验根元素并从根元素的参数属性中细化设置。

use tracing::{debug, warn};

use super::{
    constants::{
        ATTR_CELL_RESOLUTION, ATTR_EXTENT, ATTR_FRAME_RATE, ATTR_FRAME_RATE_MULTIPLIER,
        ATTR_SUB_FRAME_RATE, ATTR_TICK_RATE, ATTR_TIME_BASE, TAG_TT,
    },
    utils::{get_attribute, parse_integer_pair, parse_pixel_extent, parse_positive_number},
};
use crate::{
    document::Document,
    error::{CompositorError, CompositorResult},
    settings::{CellResolution, Namespaces, Settings},
};

/// 确认根元素是 `<tt>`。
///
/// 如果根元素使用了与设置不同的命名空间，则以文档的命名空间为准，
/// 并通过固定后缀推导出样式、参数和元数据命名空间。
pub(super) fn verify_root(doc: &Document, settings: &mut Settings) -> CompositorResult<()> {
    let root = doc
        .element(doc.root())
        .ok_or_else(|| CompositorError::InvalidRoot("根节点不是元素".to_string()))?;

    if root.local_name != TAG_TT {
        return Err(CompositorError::InvalidRoot(format!(
            "期望 <{TAG_TT}>，实际为 <{}>",
            root.local_name
        )));
    }

    let document_ns = root.namespace.as_deref().unwrap_or("");
    if document_ns != settings.namespaces.ttml {
        warn!(
            expected = %settings.namespaces.ttml,
            actual = %document_ns,
            "文档使用了非标准的命名空间，将以文档命名空间为准"
        );
        settings.namespaces = Namespaces::derived_from(document_ns);
    }

    Ok(())
}

/// 读取根元素上的参数属性，细化设置。
///
/// 支持 `ttp:cellResolution`、`tts:extent`，以及帧率、子帧率、tick 率和时间基准参数。
/// 无法解析的值会被忽略并记录警告。
pub(super) fn parse_root_attributes(doc: &Document, settings: &mut Settings) {
    let root = doc.root();
    let parameter_ns = settings.namespaces.parameter.clone();
    let styling_ns = settings.namespaces.styling.clone();
    let param = |name: &str| get_attribute(doc, root, Some(&parameter_ns), name);

    if let Some(value) = param(ATTR_CELL_RESOLUTION) {
        match parse_integer_pair(value) {
            Some((columns, rows)) => {
                settings.cell_resolution = CellResolution { rows, columns };
            }
            None => warn!(value = %value, "无法解析 ttp:cellResolution，使用默认值"),
        }
    }

    if let Some(value) = get_attribute(doc, root, Some(&styling_ns), ATTR_EXTENT) {
        match parse_pixel_extent(value) {
            Some(dimensions) => settings.root_container_region_dimensions = Some(dimensions),
            None => warn!(value = %value, "根元素的 tts:extent 不是像素尺寸，已忽略"),
        }
    }

    if let Some(value) = param(ATTR_FRAME_RATE) {
        match parse_positive_number(value) {
            Some(rate) => settings.media_frame_rate = rate,
            None => warn!(value = %value, "无法解析 ttp:frameRate"),
        }
    }

    if let Some(value) = param(ATTR_FRAME_RATE_MULTIPLIER) {
        match parse_integer_pair(value) {
            Some((numerator, denominator)) => {
                settings.media_frame_rate_multiplier =
                    f64::from(numerator) / f64::from(denominator);
            }
            None => warn!(value = %value, "无法解析 ttp:frameRateMultiplier"),
        }
    }

    if let Some(value) = param(ATTR_SUB_FRAME_RATE) {
        match parse_positive_number(value) {
            Some(rate) => settings.media_sub_frame_rate = rate,
            None => warn!(value = %value, "无法解析 ttp:subFrameRate"),
        }
    }

    if let Some(value) = param(ATTR_TICK_RATE) {
        match parse_positive_number(value) {
            Some(rate) => settings.media_tick_rate = rate,
            None => warn!(value = %value, "无法解析 ttp:tickRate"),
        }
    }

    if let Some(value) = param(ATTR_TIME_BASE)
        && !settings.supported_time_base.iter().any(|b| b == value)
    {
        warn!(time_base = %value, "不支持的时间基准，时间表达式将按媒体时间处理");
    }

    debug!(
        cell_resolution = ?settings.cell_resolution,
        root_extent = ?settings.root_container_region_dimensions,
        frame_rate = settings.effective_frame_rate(),
        tick_rate = settings.media_tick_rate,
        "根元素参数已读取"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Dimensions;

    #[test]
    fn test_non_tt_root_is_rejected() {
        let doc = Document::parse(r#"<html xmlns="http://www.w3.org/ns/ttml"/>"#).unwrap();
        let mut settings = Settings::default();
        assert!(matches!(
            verify_root(&doc, &mut settings),
            Err(CompositorError::InvalidRoot(_))
        ));
    }

    #[test]
    fn test_non_canonical_namespace_is_adopted() {
        let doc = Document::parse(r#"<tt xmlns="http://www.w3.org/2006/10/ttaf1"/>"#).unwrap();
        let mut settings = Settings::default();
        verify_root(&doc, &mut settings).unwrap();
        assert_eq!(settings.namespaces.ttml, "http://www.w3.org/2006/10/ttaf1");
        assert_eq!(
            settings.namespaces.styling,
            "http://www.w3.org/2006/10/ttaf1#styling"
        );
        assert_eq!(
            settings.namespaces.parameter,
            "http://www.w3.org/2006/10/ttaf1#parameter"
        );
    }

    #[test]
    fn test_root_parameters_refine_settings() {
        let doc = Document::parse(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"
                   xmlns:ttp="http://www.w3.org/ns/ttml#parameter"
                   xmlns:tts="http://www.w3.org/ns/ttml#styling"
                   ttp:cellResolution="40 20"
                   ttp:frameRate="30"
                   ttp:frameRateMultiplier="1000 1001"
                   ttp:tickRate="10000000"
                   tts:extent="1920px 1080px"/>"#,
        )
        .unwrap();
        let mut settings = Settings::default();
        verify_root(&doc, &mut settings).unwrap();
        parse_root_attributes(&doc, &mut settings);

        assert_eq!(
            settings.cell_resolution,
            CellResolution {
                rows: 20,
                columns: 40
            }
        );
        assert_eq!(
            settings.root_container_region_dimensions,
            Some(Dimensions::new(1920.0, 1080.0))
        );
        assert!((settings.effective_frame_rate() - 29.970_029_97).abs() < 1e-6);
        assert!((settings.media_tick_rate - 10_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_root_parameters_are_ignored() {
        let doc = Document::parse(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"
                   xmlns:ttp="http://www.w3.org/ns/ttml#parameter"
                   ttp:cellResolution="wide"/>"#,
        )
        .unwrap();
        let mut settings = Settings::default();
        parse_root_attributes(&doc, &mut settings);
        assert_eq!(settings.cell_resolution, CellResolution::default());
    }
}
