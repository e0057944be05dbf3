//! # 解析器的状态和旁路数据结构

use std::collections::{BTreeMap, HashMap, btree_map::Entry};

use serde::Serialize;

use crate::{document::NodeId, settings::Settings, time::TimeParser};

/// 样式属性名到文本值的映射。
pub type StyleSet = BTreeMap<String, String>;

/// 一个带时间元素的激活区间（毫秒），`end >= start`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingInterval {
    pub start: i64,
    pub end: i64,
}

impl TimingInterval {
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// 半开区间判断：`start <= t < end`。
    #[must_use]
    pub const fn contains(&self, t: i64) -> bool {
        self.start <= t && t < self.end
    }
}

/// 激活时间标记：某个元素区间的起点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub time: i64,
    #[serde(skip)]
    pub element: NodeId,
}

/// 每个节点在解析阶段计算出的结果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeAnnotation {
    pub interval: Option<TimingInterval>,
    /// 非空样式集在共享缓存中的下标；空样式集没有下标。
    pub style_index: Option<usize>,
}

/// 共享的样式缓存。相同的非空样式集只存储一次。
#[derive(Debug, Default)]
pub(crate) struct StyleCache {
    styles: Vec<StyleSet>,
    lookup: HashMap<StyleSet, usize>,
}

impl StyleCache {
    /// 存入一个样式集，返回它的下标。空样式集不存储，返回 `None`。
    pub(crate) fn intern(&mut self, set: StyleSet) -> Option<usize> {
        if set.is_empty() {
            return None;
        }
        if let Some(&index) = self.lookup.get(&set) {
            return Some(index);
        }
        let index = self.styles.len();
        self.styles.push(set.clone());
        self.lookup.insert(set, index);
        Some(index)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, index: usize) -> Option<&StyleSet> {
        self.styles.get(index)
    }

    pub(crate) fn into_styles(self) -> Vec<StyleSet> {
        self.styles
    }
}

/// 解析器在各个阶段之间共享的状态。
#[derive(Debug)]
pub(super) struct ParserState {
    pub(super) settings: Settings,
    pub(super) time_parser: TimeParser,
    pub(super) annotations: Vec<NodeAnnotation>,
    /// 按时间排序、去重的事件；同一时间先记录的元素优先。
    pub(super) events: BTreeMap<i64, NodeId>,
    pub(super) style_cache: StyleCache,
}

impl ParserState {
    pub(super) fn new(settings: Settings) -> Self {
        Self {
            time_parser: TimeParser::from_settings(&settings),
            settings,
            annotations: Vec::new(),
            events: BTreeMap::new(),
            style_cache: StyleCache::default(),
        }
    }

    /// 记录一个事件。负时间不记录，已有相同时间的事件时保留先前的元素。
    pub(super) fn record_event(&mut self, time: i64, element: NodeId) {
        if time < 0 {
            return;
        }
        if let Entry::Vacant(entry) = self.events.entry(time) {
            entry.insert(element);
        }
    }

    pub(super) fn annotation_mut(&mut self, node: NodeId) -> &mut NodeAnnotation {
        &mut self.annotations[node.index()]
    }

    pub(super) fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
            .into_iter()
            .map(|(time, element)| Event { time, element })
            .collect()
    }
}
