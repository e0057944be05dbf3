//! # TTML 解析器 - 文档元数据
//!
//! 读取 `<head>` 中的 `ttm:title` 和 `ttm:desc`。

use serde::Serialize;

use super::constants::{TAG_DESC, TAG_HEAD, TAG_METADATA, TAG_TITLE};
use crate::{
    document::{Document, NodeId},
    settings::Namespaces,
};

/// 文档级元数据。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// 从 `<head>` 或 `<head>/<metadata>` 中提取标题和描述，取第一次出现的值。
pub(super) fn extract_metadata(doc: &Document, namespaces: &Namespaces) -> DocumentMetadata {
    let mut metadata = DocumentMetadata::default();
    let Some(head) = doc.child_element(doc.root(), &namespaces.ttml, TAG_HEAD) else {
        return metadata;
    };

    let mut containers = vec![head];
    containers.extend(doc.child_elements(head, &namespaces.ttml, TAG_METADATA));

    for container in containers {
        if metadata.title.is_none() {
            metadata.title = doc
                .child_element(container, &namespaces.metadata, TAG_TITLE)
                .and_then(|n| text_content(doc, n));
        }
        if metadata.description.is_none() {
            metadata.description = doc
                .child_element(container, &namespaces.metadata, TAG_DESC)
                .and_then(|n| text_content(doc, n));
        }
    }

    metadata
}

fn text_content(doc: &Document, node: NodeId) -> Option<String> {
    let text: String = doc
        .descendants(node)
        .into_iter()
        .filter_map(|n| doc.text(n))
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_description_are_extracted() {
        let doc = Document::parse(
            r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:ttm="http://www.w3.org/ns/ttml#metadata">
                <head>
                    <metadata>
                        <ttm:title> Episode 1 </ttm:title>
                    </metadata>
                    <ttm:desc>English captions</ttm:desc>
                </head>
            </tt>"#,
        )
        .unwrap();

        let metadata = extract_metadata(&doc, &Namespaces::default());
        assert_eq!(metadata.title.as_deref(), Some("Episode 1"));
        assert_eq!(metadata.description.as_deref(), Some("English captions"));
    }

    #[test]
    fn test_missing_head_yields_empty_metadata() {
        let doc = Document::parse(r#"<tt xmlns="http://www.w3.org/ns/ttml"/>"#).unwrap();
        assert_eq!(
            extract_metadata(&doc, &Namespaces::default()),
            DocumentMetadata::default()
        );
    }
}
