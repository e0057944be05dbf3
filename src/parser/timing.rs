//! # TTML 解析器 - 时间区间计算
//!
//! 递归地为 `<body>` 及其所有后代元素计算绝对激活区间。
//!
//! - 并行容器（默认）：每个子元素都以父元素自身的区间为边界。
//! - 顺序容器（`timeContainer="seq"`）：第一个子元素以 `[父起点, 父终点]` 为边界，
//!   之后的子元素以 `[前一个子元素终点, 父终点]` 为边界。

use tracing::trace;

use super::{
    constants::{
        ATTR_BEGIN, ATTR_DUR, ATTR_END, ATTR_TIME_CONTAINER, END_OF_MEDIA, TIME_CONTAINER_SEQ,
    },
    state::{ParserState, TimingInterval},
    utils::get_plain_attribute,
};
use crate::document::{Document, NodeId};

/// 为 `node` 及其后代计算区间，返回 `node` 的区间。
///
/// `parent` 是计算边界；`is_parallel` 表示 `node` 是否处于并行传播中，
/// 它决定了既没有 `end` 也没有 `dur` 的元素是继承边界终点还是退化为零长度。
pub(super) fn compute_intervals(
    doc: &Document,
    state: &mut ParserState,
    node: NodeId,
    parent: TimingInterval,
    is_parallel: bool,
) -> TimingInterval {
    let parser = state.time_parser;
    // 哨兵起点为负，偏移量总是相对于媒体零点或父元素的实际起点
    let parent_origin = parent.start.max(0);

    let begin = get_plain_attribute(doc, node, ATTR_BEGIN);
    let end_attr = get_plain_attribute(doc, node, ATTR_END).map(|v| parser.parse(v));
    let dur_attr = get_plain_attribute(doc, node, ATTR_DUR).map(|v| parser.parse(v));

    let start = begin
        .map_or(parent.start, |b| parent_origin.saturating_add(parser.parse(b)))
        .min(END_OF_MEDIA);
    let own_origin = start.max(0);

    let end = match (dur_attr, end_attr) {
        (Some(dur), Some(end)) => {
            let by_dur = own_origin.saturating_add(dur).min(parent.end);
            let by_end = parent_origin.saturating_add(end).min(parent.end);
            by_dur.min(by_end)
        }
        (None, Some(end)) => parent_origin.saturating_add(end).min(parent.end),
        (Some(dur), None) => own_origin.saturating_add(dur).min(parent.end),
        (None, None) if is_parallel => parent.end,
        (None, None) => 0,
    };
    let interval = TimingInterval::new(start, end.max(start));

    state.record_event(interval.start, node);
    state.annotation_mut(node).interval = Some(interval);
    trace!(
        node = node.index(),
        start = interval.start,
        end = interval.end,
        "已计算元素区间"
    );

    let sequential = get_plain_attribute(doc, node, ATTR_TIME_CONTAINER)
        .is_some_and(|v| v.trim() == TIME_CONTAINER_SEQ);

    let mut bound = interval;
    for &child in doc.children(node) {
        if doc.element(child).is_none() {
            continue;
        }
        let child_interval = compute_intervals(doc, state, child, bound, !sequential);
        if sequential {
            bound = TimingInterval::new(child_interval.end, interval.end);
        }
    }

    interval
}
