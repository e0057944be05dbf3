//! # 长度单位换算
//!
//! TTML 长度支持 `px`、`c`（单元格）、`%` 和 `em`。
//! 单元格单位相对于单元格网格和当前视口换算；像素单位在已知根容器尺寸时
//! 按视口与根容器的比例缩放；百分比相对于给定的包含框换算，没有包含框时相对于视口。

use crate::settings::{CellResolution, Dimensions, Settings};

/// 长度所在的轴向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Horizontal,
    Vertical,
}

/// 解析后的长度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Length {
    Px(f64),
    Percent(f64),
    Em(f64),
}

impl Length {
    /// 输出为 CSS 长度文本。
    pub(crate) fn to_css(self) -> String {
        match self {
            Self::Px(v) => format!("{}px", round_to_tenth(v)),
            Self::Percent(v) => format!("{v}%"),
            Self::Em(v) => format!("{v}em"),
        }
    }

    /// 把百分比相对于 `containing` 换算为像素，其余单位不变。
    pub(crate) fn resolve_percent(self, containing: f64) -> Self {
        match self {
            Self::Percent(v) => Self::Px(round_to_tenth(v * containing / 100.0)),
            other => other,
        }
    }

    pub(crate) const fn as_px(self) -> Option<f64> {
        match self {
            Self::Px(v) => Some(v),
            _ => None,
        }
    }
}

/// 四舍五入到一位小数。
pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 把 `"12.5px"` 拆成数值和单位。
pub(crate) fn split_length(token: &str) -> Option<(f64, &str)> {
    let token = token.trim();
    let split = token
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map_or(token.len(), |(i, _)| i);
    let (number, unit) = token.split_at(split);
    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some((value, unit))
}

/// 按当前视口和单元格网格换算长度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UnitResolver {
    viewport: Dimensions,
    cell_resolution: CellResolution,
    root_extent: Option<Dimensions>,
}

impl UnitResolver {
    pub(crate) const fn new(
        viewport: Dimensions,
        cell_resolution: CellResolution,
        root_extent: Option<Dimensions>,
    ) -> Self {
        Self {
            viewport,
            cell_resolution,
            root_extent,
        }
    }

    pub(crate) const fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.related_media_object_region,
            settings.cell_resolution,
            settings.root_container_region_dimensions,
        )
    }

    pub(crate) const fn viewport(&self) -> Dimensions {
        self.viewport
    }

    pub(crate) const fn viewport_dimension(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.viewport.width,
            Axis::Vertical => self.viewport.height,
        }
    }

    /// `px = round(n * 视口尺寸 / 网格尺寸, 1 位小数)`。
    pub(crate) fn cell_to_px(&self, cells: f64, axis: Axis) -> f64 {
        let (dimension, grid) = match axis {
            Axis::Horizontal => (self.viewport.width, self.cell_resolution.columns),
            Axis::Vertical => (self.viewport.height, self.cell_resolution.rows),
        };
        if grid == 0 {
            return 0.0;
        }
        round_to_tenth(cells * dimension / f64::from(grid))
    }

    /// 把文档坐标系中的像素缩放到视口坐标系。根容器尺寸未知时原样返回。
    pub(crate) fn scale_px(&self, px: f64, axis: Axis) -> f64 {
        let Some(root) = self.root_extent else {
            return px;
        };
        let (root_dimension, viewport_dimension) = match axis {
            Axis::Horizontal => (root.width, self.viewport.width),
            Axis::Vertical => (root.height, self.viewport.height),
        };
        if root_dimension <= 0.0 || viewport_dimension <= 0.0 {
            return px;
        }
        round_to_tenth(px * viewport_dimension / root_dimension)
    }

    /// 解析单个长度。无法识别的单位返回 `None`。
    pub(crate) fn length(&self, token: &str, axis: Axis) -> Option<Length> {
        let (value, unit) = split_length(token)?;
        match unit {
            "px" => Some(Length::Px(self.scale_px(value, axis))),
            "c" => Some(Length::Px(self.cell_to_px(value, axis))),
            "%" => Some(Length::Percent(value)),
            "em" => Some(Length::Em(value)),
            _ => None,
        }
    }

    /// 解析长度并把百分比换算为像素；`containing` 缺省时相对于视口。
    pub(crate) fn absolute_length(
        &self,
        token: &str,
        axis: Axis,
        containing: Option<f64>,
    ) -> Option<Length> {
        let containing = containing.unwrap_or_else(|| self.viewport_dimension(axis));
        self.length(token, axis)
            .map(|l| l.resolve_percent(containing))
    }
}
