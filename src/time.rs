//! # 时间表达式解析
//!
//! 支持两种 TTML 时间表达式：
//! - 时钟形式：`H:MM:SS[.fff]` 或 `H:MM:SS:FF[.SSS]`（帧与子帧）。
//! - 偏移形式：`<number><unit>`，单位为 `h`、`m`、`s`、`ms`、`f`、`t`。
//!
//! 任何无法解析的输入都返回 `0`，不会产生错误。

use std::sync::LazyLock;

use regex::Regex;

use crate::settings::Settings;

static CLOCK_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<hours>\d+):(?P<minutes>\d{2}):(?P<seconds>\d{2})(?:(?P<fraction>\.\d+)|:(?P<frames>\d+)(?:\.(?P<sub_frames>\d+))?)?$",
    )
    .expect("编译 CLOCK_TIME_REGEX 失败")
});

static OFFSET_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<value>\d+(?:\.\d+)?)(?P<unit>ms|h|m|s|f|t)$")
        .expect("编译 OFFSET_TIME_REGEX 失败")
});

/// 将 TTML 时间表达式转换为毫秒。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeParser {
    frame_rate: f64,
    sub_frame_rate: f64,
    tick_rate: f64,
}

impl TimeParser {
    /// 使用给定的帧率、子帧率和 tick 率创建解析器。
    #[must_use]
    pub const fn new(frame_rate: f64, sub_frame_rate: f64, tick_rate: f64) -> Self {
        Self {
            frame_rate,
            sub_frame_rate,
            tick_rate,
        }
    }

    /// 根据设置中的媒体帧率参数创建解析器。
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.effective_frame_rate(),
            settings.media_sub_frame_rate,
            settings.media_tick_rate,
        )
    }

    /// 解析时间表达式，返回毫秒数。
    ///
    /// 空字符串或无法识别的格式返回 `0`。
    #[must_use]
    pub fn parse(&self, text: &str) -> i64 {
        let text = text.trim();
        if text.is_empty() {
            return 0;
        }

        let ms = if let Some(caps) = CLOCK_TIME_REGEX.captures(text) {
            self.parse_clock_time(&caps)
        } else if let Some(caps) = OFFSET_TIME_REGEX.captures(text) {
            self.parse_offset_time(&caps["value"], &caps["unit"])
        } else {
            None
        };

        ms.map_or(0, to_whole_ms)
    }

    /// 与 [`TimeParser::parse`] 相同，但接受可能缺失的值。
    #[must_use]
    pub fn parse_optional(&self, text: Option<&str>) -> i64 {
        text.map_or(0, |t| self.parse(t))
    }

    fn parse_clock_time(&self, caps: &regex::Captures<'_>) -> Option<f64> {
        let hours: f64 = caps["hours"].parse().ok()?;
        let minutes: f64 = caps["minutes"].parse().ok()?;
        let seconds: f64 = caps["seconds"].parse().ok()?;

        let mut ms = (hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0;

        if let Some(fraction) = caps.name("fraction") {
            // ".5" -> 0.5 秒
            let fraction: f64 = format!("0{}", fraction.as_str()).parse().ok()?;
            ms += fraction * 1000.0;
        }

        if let Some(frames) = caps.name("frames") {
            if self.frame_rate <= 0.0 {
                return None;
            }
            let frames: f64 = frames.as_str().parse().ok()?;
            ms += frames * 1000.0 / self.frame_rate;

            if let Some(sub_frames) = caps.name("sub_frames") {
                if self.sub_frame_rate <= 0.0 {
                    return None;
                }
                let sub_frames: f64 = sub_frames.as_str().parse().ok()?;
                ms += sub_frames * 1000.0 / (self.frame_rate * self.sub_frame_rate);
            }
        }

        Some(ms)
    }

    fn parse_offset_time(&self, value: &str, unit: &str) -> Option<f64> {
        let value: f64 = value.parse().ok()?;
        let ms = match unit {
            "h" => value * 3_600_000.0,
            "m" => value * 60_000.0,
            "s" => value * 1000.0,
            "ms" => value,
            "f" if self.frame_rate > 0.0 => value * 1000.0 / self.frame_rate,
            "t" if self.tick_rate > 0.0 => value * 1000.0 / self.tick_rate,
            _ => return None,
        };
        Some(ms)
    }
}

impl Default for TimeParser {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// 向下取整到整毫秒。先在微秒精度上四舍五入，避免 `1.001s` 之类的小数误差。
fn to_whole_ms(ms: f64) -> i64 {
    ((ms * 1000.0).round() / 1000.0).floor() as i64
}
