//! # TTML 解析器 - 匿名 span 规范化
//!
//! 把直接位于 `<p>` 下、没有被行内元素包裹的连续文本节点包进一个合成的 `<span>`，
//! 这样后续的计时和样式继承可以统一处理所有文本。

use super::constants::{TAG_BODY, TAG_P, TAG_SPAN};
use crate::document::{Document, Element, NodeData, NodeId};

/// 对 `<body>` 下的内容执行规范化。
///
/// 段落以外的块级容器中只含空白的文本节点没有意义，会被一并移除。
pub(super) fn normalize_anonymous_spans(doc: &mut Document, ttml_ns: &str) {
    let Some(body) = doc.child_element(doc.root(), ttml_ns, TAG_BODY) else {
        return;
    };

    let mut containers = vec![body];
    containers.extend(
        doc.descendants(body)
            .into_iter()
            .filter(|&id| doc.element(id).is_some()),
    );

    for node in containers {
        let (is_paragraph, is_inline) = match doc.element(node) {
            Some(e) => (e.is(ttml_ns, TAG_P), e.is(ttml_ns, TAG_SPAN)),
            None => continue,
        };

        if is_paragraph {
            wrap_text_runs(doc, node, ttml_ns);
        } else if !is_inline {
            strip_whitespace_text(doc, node);
        }
    }
}

fn wrap_text_runs(doc: &mut Document, paragraph: NodeId, ttml_ns: &str) {
    let children = doc.children(paragraph).to_vec();
    let mut new_children = Vec::with_capacity(children.len());
    let mut run: Vec<NodeId> = Vec::new();

    for child in children {
        if doc.text(child).is_some() {
            run.push(child);
            continue;
        }
        if !run.is_empty() {
            new_children.push(wrap_run(doc, std::mem::take(&mut run), ttml_ns));
        }
        new_children.push(child);
    }
    if !run.is_empty() {
        new_children.push(wrap_run(doc, run, ttml_ns));
    }

    doc.replace_children(paragraph, new_children);
}

fn wrap_run(doc: &mut Document, run: Vec<NodeId>, ttml_ns: &str) -> NodeId {
    let mut element = Element::new(Some(ttml_ns), TAG_SPAN);
    element.synthesized = true;
    let span = doc.create_node(NodeData::Element(element));
    doc.replace_children(span, run);
    span
}

fn strip_whitespace_text(doc: &mut Document, node: NodeId) {
    let children = doc.children(node).to_vec();
    let kept: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|&child| doc.text(child).is_none_or(|t| !t.trim().is_empty()))
        .collect();
    if kept.len() != children.len() {
        doc.replace_children(node, kept);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://www.w3.org/ns/ttml";

    fn paragraph(doc: &Document) -> NodeId {
        let body = doc.child_element(doc.root(), NS, TAG_BODY).unwrap();
        let div = doc.children(body)[0];
        doc.children(div)[0]
    }

    #[test]
    fn test_bare_text_runs_are_wrapped() {
        let mut doc = Document::parse(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"><body>
                <div>
                    <p>Hello <span>big</span> world<br/>again</p>
                </div>
            </body></tt>"#,
        )
        .unwrap();
        normalize_anonymous_spans(&mut doc, NS);

        let p = paragraph(&doc);
        let kinds: Vec<(String, bool)> = doc
            .children(p)
            .iter()
            .map(|&c| {
                let e = doc.element(c).expect("p 的子节点应全部是元素");
                (e.local_name.clone(), e.synthesized)
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("span".to_string(), true),
                ("span".to_string(), false),
                ("span".to_string(), true),
                ("br".to_string(), false),
                ("span".to_string(), true),
            ]
        );

        let first = doc.children(p)[0];
        assert_eq!(doc.text(doc.children(first)[0]), Some("Hello "));
        assert_eq!(doc.parent(doc.children(first)[0]), Some(first));
    }

    #[test]
    fn test_whitespace_between_blocks_is_removed() {
        let mut doc = Document::parse(
            "<tt xmlns=\"http://www.w3.org/ns/ttml\"><body>\n  <div>\n    <p>x</p>\n  </div>\n</body></tt>",
        )
        .unwrap();
        normalize_anonymous_spans(&mut doc, NS);

        let body = doc.child_element(doc.root(), NS, TAG_BODY).unwrap();
        assert_eq!(doc.children(body).len(), 1);
        let div = doc.children(body)[0];
        assert_eq!(doc.children(div).len(), 1);
    }
}
