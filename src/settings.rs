//! # 合成器设置
//!
//! `Settings` 是一个纯配置值：命名空间、帧率/tick 率、单元格网格、字体映射、
//! 默认区域样式以及视口尺寸。调用方通过 JSON 值提供覆盖项，
//! 覆盖项会与默认值进行深度合并。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CompositorResult;

/// TTML 使用的各个命名空间。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Namespaces {
    /// 文档命名空间（`tt`、`body`、`p` 等元素）。
    pub ttml: String,
    /// 样式属性命名空间（`tts:*`）。
    pub styling: String,
    /// 参数属性命名空间（`ttp:*`）。
    pub parameter: String,
    /// 元数据命名空间（`ttm:*`）。
    pub metadata: String,
}

impl Namespaces {
    /// 以给定的文档命名空间为基础，通过固定后缀推导出其余命名空间。
    #[must_use]
    pub fn derived_from(ttml: &str) -> Self {
        Self {
            ttml: ttml.to_owned(),
            styling: format!("{ttml}#styling"),
            parameter: format!("{ttml}#parameter"),
            metadata: format!("{ttml}#metadata"),
        }
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::derived_from("http://www.w3.org/ns/ttml")
    }
}

/// 单元格网格，`c` 单位相对于它换算。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellResolution {
    pub rows: u32,
    pub columns: u32,
}

impl Default for CellResolution {
    fn default() -> Self {
        Self {
            rows: 15,
            columns: 32,
        }
    }
}

/// 一个以像素为单位的矩形尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// 合成器的全部配置。
///
/// 所有字段都有默认值，见 [`Settings::default`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub namespaces: Namespaces,
    pub media_frame_rate: f64,
    pub media_frame_rate_multiplier: f64,
    pub media_sub_frame_rate: f64,
    pub media_tick_rate: f64,
    /// 支持的时间基准。数组在合并时整体替换。
    pub supported_time_base: Vec<String>,
    pub cell_resolution: CellResolution,
    /// TTML 通用字体族名称到具体字体栈的映射。
    pub font_map: BTreeMap<String, String>,
    /// 区域的初始样式，内容从这里继承文本相关的属性。
    pub default_region_style: BTreeMap<String, String>,
    /// 文档声明的根容器尺寸（`tts:extent`），未声明时为 `None`。
    pub root_container_region_dimensions: Option<Dimensions>,
    /// 当前视口尺寸，百分比和单元格单位相对于它换算。
    pub related_media_object_region: Dimensions,
}

impl Default for Settings {
    fn default() -> Self {
        let font_map = [
            ("default", "monospace, sans-serif"),
            ("monospace", "monospace"),
            ("sansSerif", "sans-serif"),
            ("serif", "serif"),
            ("monospaceSansSerif", "\"Lucida Console\", Monaco, monospace"),
            ("monospaceSerif", "\"Courier New\", Courier, monospace"),
            ("proportionalSansSerif", "Arial, Helvetica, sans-serif"),
            ("proportionalSerif", "\"Times New Roman\", Times, serif"),
        ];

        let default_region_style = [
            ("backgroundColor", "transparent"),
            ("color", "white"),
            ("direction", "ltr"),
            ("display", "auto"),
            ("displayAlign", "before"),
            ("extent", "auto"),
            ("fontFamily", "default"),
            ("fontSize", "1c"),
            ("fontStyle", "normal"),
            ("fontWeight", "normal"),
            ("lineHeight", "normal"),
            ("opacity", "1"),
            ("origin", "auto"),
            ("overflow", "hidden"),
            ("padding", "0px"),
            ("showBackground", "always"),
            ("textAlign", "start"),
            ("textDecoration", "none"),
            ("textOutline", "none"),
            ("unicodeBidi", "normal"),
            ("visibility", "visible"),
            ("wrapOption", "wrap"),
            ("writingMode", "lrtb"),
            ("zIndex", "auto"),
        ];

        Self {
            namespaces: Namespaces::default(),
            media_frame_rate: 30.0,
            media_frame_rate_multiplier: 1.0,
            media_sub_frame_rate: 1.0,
            media_tick_rate: 1.0,
            supported_time_base: vec!["media".to_string()],
            cell_resolution: CellResolution::default(),
            font_map: font_map
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_region_style: default_region_style
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            root_container_region_dimensions: None,
            related_media_object_region: Dimensions::default(),
        }
    }
}

impl Settings {
    /// 以默认设置为基础，深度合并调用方提供的覆盖项。
    ///
    /// 嵌套对象按键合并，数组和标量整体替换；`null` 表示没有覆盖项。
    pub fn with_overrides(overrides: &Value) -> CompositorResult<Self> {
        if overrides.is_null() {
            return Ok(Self::default());
        }
        let mut merged = serde_json::to_value(Self::default())?;
        deep_merge(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    /// 实际生效的帧率（考虑帧率乘数）。
    #[must_use]
    pub fn effective_frame_rate(&self) -> f64 {
        self.media_frame_rate * self.media_frame_rate_multiplier
    }
}

/// 将 `patch` 深度合并进 `target`。
pub(crate) fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match target_map.get_mut(key) {
                    Some(existing) if existing.is_object() && patch_value.is_object() => {
                        deep_merge(existing, patch_value);
                    }
                    _ => {
                        target_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
