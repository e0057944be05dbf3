//! # TTML 解析器 - 布局与区域
//!
//! 保证文档中存在 `<head>/<layout>` 以及至少一个区域。

use tracing::{debug, warn};

use super::constants::{
    ANONYMOUS_REGION_ID, ATTR_REGION, TAG_BODY, TAG_HEAD, TAG_LAYOUT, TAG_REGION,
};
use crate::document::{Document, Element, NodeData, NodeId, XML_NAMESPACE};

/// 确保布局区存在并至少包含一个区域，返回所有可用区域（文档顺序）。
///
/// 没有声明任何区域时，合成一个匿名区域并把 `<body>` 绑定到它。
/// 没有 `xml:id` 的区域无法被引用，会被忽略。
pub(super) fn ensure_regions(doc: &mut Document, ttml_ns: &str) -> Vec<NodeId> {
    let root = doc.root();

    let head = doc.child_element(root, ttml_ns, TAG_HEAD).unwrap_or_else(|| {
        let head = doc.create_node(NodeData::Element(synthesized(ttml_ns, TAG_HEAD)));
        doc.insert_child(root, 0, head);
        head
    });

    let layout = doc
        .child_element(head, ttml_ns, TAG_LAYOUT)
        .unwrap_or_else(|| {
            let layout = doc.create_node(NodeData::Element(synthesized(ttml_ns, TAG_LAYOUT)));
            doc.append_child(head, layout);
            layout
        });

    let declared: Vec<NodeId> = doc.child_elements(layout, ttml_ns, TAG_REGION).collect();
    let mut regions = Vec::with_capacity(declared.len().max(1));
    for region in declared {
        if doc.element(region).and_then(Element::xml_id).is_some() {
            regions.push(region);
        } else {
            warn!("忽略了一个没有 xml:id 的区域");
        }
    }

    if regions.is_empty() {
        let mut element = synthesized(ttml_ns, TAG_REGION);
        element.set_attribute(Some(XML_NAMESPACE), "id", ANONYMOUS_REGION_ID);
        let region = doc.create_node(NodeData::Element(element));
        doc.append_child(layout, region);
        regions.push(region);

        if let Some(body) = doc.child_element(root, ttml_ns, TAG_BODY)
            && let Some(body_el) = doc.element_mut(body)
            && body_el.attribute(None, ATTR_REGION).is_none()
        {
            body_el.set_attribute(None, ATTR_REGION, ANONYMOUS_REGION_ID);
        }
        debug!("文档未声明区域，已合成匿名区域");
    }

    regions
}

fn synthesized(ttml_ns: &str, local_name: &str) -> Element {
    let mut element = Element::new(Some(ttml_ns), local_name);
    element.synthesized = true;
    element
}
