//! # TTML 解析器 - 常量定义
//!
//! 解析和合成阶段用到的标签名、属性名和哨兵时间。

pub(crate) const TAG_TT: &str = "tt";
pub(crate) const TAG_HEAD: &str = "head";
pub(crate) const TAG_STYLING: &str = "styling";
pub(crate) const TAG_STYLE: &str = "style";
pub(crate) const TAG_LAYOUT: &str = "layout";
pub(crate) const TAG_REGION: &str = "region";
pub(crate) const TAG_METADATA: &str = "metadata";
pub(crate) const TAG_BODY: &str = "body";
pub(crate) const TAG_DIV: &str = "div";
pub(crate) const TAG_P: &str = "p";
pub(crate) const TAG_SPAN: &str = "span";
pub(crate) const TAG_BR: &str = "br";

pub(crate) const TAG_TITLE: &str = "title";
pub(crate) const TAG_DESC: &str = "desc";

pub(crate) const ATTR_BEGIN: &str = "begin";
pub(crate) const ATTR_END: &str = "end";
pub(crate) const ATTR_DUR: &str = "dur";
pub(crate) const ATTR_TIME_CONTAINER: &str = "timeContainer";
pub(crate) const ATTR_REGION: &str = "region";
pub(crate) const ATTR_STYLE: &str = "style";
pub(crate) const ATTR_SPACE: &str = "space";

pub(crate) const ATTR_CELL_RESOLUTION: &str = "cellResolution";
pub(crate) const ATTR_FRAME_RATE: &str = "frameRate";
pub(crate) const ATTR_FRAME_RATE_MULTIPLIER: &str = "frameRateMultiplier";
pub(crate) const ATTR_SUB_FRAME_RATE: &str = "subFrameRate";
pub(crate) const ATTR_TICK_RATE: &str = "tickRate";
pub(crate) const ATTR_TIME_BASE: &str = "timeBase";
pub(crate) const ATTR_EXTENT: &str = "extent";

pub(crate) const TIME_CONTAINER_SEQ: &str = "seq";
pub(crate) const SPACE_PRESERVE: &str = "preserve";

/// 未声明任何区域时合成的匿名区域的 `xml:id`。
pub const ANONYMOUS_REGION_ID: &str = "anonymous";

/// 根区间的起点：“从媒体开始”。
pub const START_OF_MEDIA: i64 = -1;
/// 根区间的终点：“开放结束”。
pub const END_OF_MEDIA: i64 = 999_999_999_999;
