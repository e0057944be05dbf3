//! # 时间合成器
//!
//! [`Context`] 是解析结果之上的有状态查询接口：给定播放时间，
//! 回答哪些元素处于激活状态，并生成剪裁、样式化、单位换算完成的呈现树。
//!
//! 唯一的可变状态是"上次查询的时间 / 上次的激活集合"缓存。
//! 调用方在跳转后需要调用 [`Context::reset_current_events`]，
//! 在视口尺寸变化后需要调用 [`Context::update_viewport`]。

mod colors;
mod cues;
pub mod node;
mod translate;
mod units;

use tracing::debug;

use self::{cues::CueBuilder, node::PresentationNode};
use crate::{
    document::{Document, NodeId},
    parser::{
        constants::TAG_BODY,
        metadata::DocumentMetadata,
        state::{Event, NodeAnnotation, StyleSet, TimingInterval},
    },
    settings::{Dimensions, Settings},
};

/// 激活集合中的一项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveElement {
    pub element: NodeId,
    pub start: i64,
}

/// 解析完成的文档及其查询状态。
#[derive(Debug)]
pub struct Context {
    document: Document,
    settings: Settings,
    annotations: Vec<NodeAnnotation>,
    events: Vec<Event>,
    styles: Vec<StyleSet>,
    regions: Vec<NodeId>,
    body: Option<NodeId>,
    metadata: DocumentMetadata,
    current_time: Option<i64>,
    current_events: Vec<ActiveElement>,
}

impl Context {
    pub(crate) fn new(
        document: Document,
        settings: Settings,
        annotations: Vec<NodeAnnotation>,
        events: Vec<Event>,
        styles: Vec<StyleSet>,
        regions: Vec<NodeId>,
        metadata: DocumentMetadata,
    ) -> Self {
        let body = document.child_element(document.root(), &settings.namespaces.ttml, TAG_BODY);
        Self {
            document,
            settings,
            annotations,
            events,
            styles,
            regions,
            body,
            metadata,
            current_time: None,
            current_events: Vec::new(),
        }
    }

    /// 文档是否有任何可显示的字幕。
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// 按时间升序排列、时间互不相同的事件列表，最后一项是媒体结束哨兵。
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// 严格晚于 `t` 的第一个事件时间。
    #[must_use]
    pub fn next_event_after(&self, t: i64) -> Option<i64> {
        let index = self.events.partition_point(|e| e.time <= t);
        self.events.get(index).map(|e| e.time)
    }

    /// 使激活缓存失效。播放位置发生跳转后调用。
    pub fn reset_current_events(&mut self) {
        self.current_time = None;
        self.current_events.clear();
    }

    /// 重新计算时间 `t` 的激活集合。
    ///
    /// 与缓存的集合相比，大小不同或任意位置的起点不同时替换缓存并返回 `true`。
    /// 以相同的 `t` 连续调用时第二次直接返回 `false`，不做任何计算。
    pub fn update_current_events(&mut self, t: i64) -> bool {
        if self.current_time == Some(t) {
            return false;
        }
        self.current_time = Some(t);

        let mut active = Vec::new();
        if let Some(body) = self.body {
            self.collect_active(body, t, &mut active);
        }

        let changed = active.len() != self.current_events.len()
            || active
                .iter()
                .zip(&self.current_events)
                .any(|(new, old)| new.start != old.start);
        if changed {
            debug!(time = t, active = active.len(), "激活集合已变化");
            self.current_events = active;
        }
        changed
    }

    /// 激活元素的区间总是落在父元素的区间内，所以未激活的子树可以整体跳过。
    fn collect_active(&self, node: NodeId, t: i64, out: &mut Vec<ActiveElement>) {
        let Some(interval) = self.interval_of(node) else {
            return;
        };
        if !interval.contains(t) {
            return;
        }
        out.push(ActiveElement {
            element: node,
            start: interval.start,
        });
        for &child in self.document.children(node) {
            self.collect_active(child, t, out);
        }
    }

    /// 当前缓存的激活集合（文档顺序）。
    #[must_use]
    pub fn current_events(&self) -> &[ActiveElement] {
        &self.current_events
    }

    /// 更新视口尺寸，返回尺寸是否真的发生了变化。
    pub fn update_viewport(&mut self, dimensions: Dimensions) -> bool {
        if self.settings.related_media_object_region == dimensions {
            return false;
        }
        debug!(
            width = dimensions.width,
            height = dimensions.height,
            "视口尺寸已更新"
        );
        self.settings.related_media_object_region = dimensions;
        true
    }

    /// 生成时间 `t` 的呈现树。
    ///
    /// 有任何区域输出时返回只含一个根容器节点的列表，否则返回空列表。
    pub fn get_cues(&mut self, t: i64) -> Vec<PresentationNode> {
        if self.current_time != Some(t) {
            self.update_current_events(t);
        }
        CueBuilder::new(self, t).build()
    }

    #[must_use]
    pub fn interval_of(&self, node: NodeId) -> Option<TimingInterval> {
        self.annotations.get(node.index())?.interval
    }

    /// 元素层叠后的样式；空样式集返回 `None`。
    #[must_use]
    pub fn style_of(&self, node: NodeId) -> Option<&StyleSet> {
        let index = self.annotations.get(node.index())?.style_index?;
        self.styles.get(index)
    }

    /// 共享样式缓存。
    #[must_use]
    pub fn styles(&self) -> &[StyleSet] {
        &self.styles
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// 所有可用区域（文档顺序），没有声明区域时是合成的匿名区域。
    #[must_use]
    pub fn regions(&self) -> &[NodeId] {
        &self.regions
    }

    #[must_use]
    pub const fn body(&self) -> Option<NodeId> {
        self.body
    }

    #[must_use]
    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::parser::{constants::END_OF_MEDIA, parse_ttml};

    const DOC: &str = r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div>
        <p begin="1s" end="3s">one</p>
        <p begin="2s" end="4s">two</p>
    </div></body></tt>"#;

    #[test]
    fn test_update_with_same_time_is_a_no_op() {
        let mut context = parse_ttml(DOC, &Value::Null).unwrap();
        assert!(context.update_current_events(1500));
        assert!(!context.update_current_events(1500), "相同时间第二次调用应返回 false");
    }

    #[test]
    fn test_change_detection_compares_starts_positionally() {
        let mut context = parse_ttml(DOC, &Value::Null).unwrap();
        assert!(context.update_current_events(1500));
        // 同一个 p 仍然激活，集合没有变化
        assert!(!context.update_current_events(1800));
        assert!(context.update_current_events(2500));
        assert_eq!(
            context.current_events().len(),
            6,
            "body、div、两个 p 以及各自的匿名 span"
        );
        assert!(context.update_current_events(3500));

        context.reset_current_events();
        assert!(context.current_events().is_empty());
        assert!(context.update_current_events(3500));
    }

    #[test]
    fn test_viewport_updates_report_changes() {
        let mut context = parse_ttml(DOC, &Value::Null).unwrap();
        let size = Dimensions::new(1920.0, 1080.0);
        assert!(context.update_viewport(size));
        assert!(!context.update_viewport(size));
        assert_eq!(context.settings().related_media_object_region, size);
    }

    #[test]
    fn test_next_event_after() {
        let context = parse_ttml(DOC, &Value::Null).unwrap();
        assert_eq!(context.next_event_after(0), Some(1000));
        assert_eq!(context.next_event_after(1000), Some(2000));
        assert_eq!(context.next_event_after(2000), Some(END_OF_MEDIA));
        assert_eq!(context.next_event_after(END_OF_MEDIA), None);
    }

    #[test]
    fn test_outside_every_interval_yields_no_cues() {
        let mut context = parse_ttml(DOC, &Value::Null).unwrap();
        assert!(context.get_cues(500).is_empty());
        assert!(context.get_cues(4000).is_empty());
        assert!(!context.get_cues(2500).is_empty());
    }

    #[test]
    fn test_non_empty_styles_carry_an_index() {
        let context = parse_ttml(
            r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:tts="http://www.w3.org/ns/ttml#styling">
                <body><p tts:color="red">a</p><p>b</p></body>
            </tt>"#,
            &Value::Null,
        )
        .unwrap();
        let doc = context.document();
        let paragraphs: Vec<NodeId> = doc
            .node_ids()
            .filter(|&n| doc.element(n).is_some_and(|e| e.local_name == "p"))
            .collect();
        assert_eq!(context.style_of(paragraphs[0]).unwrap()["color"], "red");
        assert!(context.style_of(paragraphs[1]).is_none());
        assert_eq!(context.styles().len(), 1);
    }
}
