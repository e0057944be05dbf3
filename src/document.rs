//! # 文档树
//!
//! 用 arena + 索引的方式保存解析后的 XML 文档：所有节点存放在一个 `Vec` 中，
//! 通过 [`NodeId`] 相互引用。解析阶段会对树做少量规范化修改，
//! 之后它在整个 [`Context`](crate::Context) 生命周期内保持不变，
//! 计算出的时间区间和样式都存放在以 `NodeId` 为键的旁路表中。

use std::str;

use quick_xml::{
    NsReader,
    events::{BytesStart, Event},
    name::ResolveResult,
};
use tracing::warn;

use crate::error::{CompositorError, CompositorResult};

/// XML 命名空间（`xml:id`、`xml:space`）。
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// 节点在文档 arena 中的稳定索引。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// 节点在 arena 中的下标。
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// 带命名空间的属性。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub value: String,
}

/// 元素节点的数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub namespace: Option<String>,
    pub local_name: String,
    pub attributes: Vec<Attribute>,
    /// 是否为解析阶段合成的元素（匿名区域、匿名 span 等）。
    pub synthesized: bool,
}

impl Element {
    #[must_use]
    pub fn new(namespace: Option<&str>, local_name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            local_name: local_name.to_owned(),
            attributes: Vec::new(),
            synthesized: false,
        }
    }

    /// 判断元素是否为给定命名空间下的给定标签。
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref().unwrap_or("") == namespace
    }

    /// 按命名空间和本地名查找属性值。`namespace` 为 `None` 表示无命名空间的属性。
    #[must_use]
    pub fn attribute(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// 设置（或替换）一个属性。
    pub fn set_attribute(&mut self, namespace: Option<&str>, local_name: &str, value: &str) {
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.local_name == local_name && a.namespace.as_deref() == namespace)
        {
            value.clone_into(&mut existing.value);
            return;
        }
        self.attributes.push(Attribute {
            namespace: namespace.map(str::to_owned),
            local_name: local_name.to_owned(),
            value: value.to_owned(),
        });
    }

    /// `xml:id` 属性。
    #[must_use]
    pub fn xml_id(&self) -> Option<&str> {
        self.attribute(Some(XML_NAMESPACE), "id")
    }
}

/// 节点内容：元素或文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

/// arena 中的一个节点。
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// 解析后的 XML 文档。
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// 从 XML 文本构建文档树。
    ///
    /// 结构性错误（标签不匹配、未闭合、缺少根元素）会直接返回错误，不做部分恢复。
    pub fn parse(content: &str) -> CompositorResult<Self> {
        let mut reader = NsReader::from_str(content);
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut builder = TreeBuilder::default();

        loop {
            let (namespace, event) = {
                let (resolved, event) = reader.read_resolved_event()?;
                (namespace_of(&resolved), event)
            };

            match event {
                Event::Start(e) => {
                    let element = read_element(&reader, &e, namespace)?;
                    builder.open(element)?;
                }
                Event::End(_) => builder.close()?,
                Event::Text(e) => {
                    let text = e.xml_content()?;
                    builder.text(&text)?;
                }
                Event::CData(e) => {
                    let text = e.decode()?;
                    builder.text(&text)?;
                }
                Event::GeneralRef(e) => {
                    let entity_name = str::from_utf8(e.as_ref())?;
                    match decode_entity(entity_name) {
                        Some(c) => builder.text(c.encode_utf8(&mut [0; 4]))?,
                        None => warn!(entity = %entity_name, "忽略了未知的 XML 实体"),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }

    /// 从原始字节构建文档树。字节必须是 UTF-8 编码。
    pub fn from_bytes(bytes: &[u8]) -> CompositorResult<Self> {
        Self::parse(str::from_utf8(bytes)?)
    }

    /// 根元素。
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// 节点总数。
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// 如果节点是元素，返回元素数据。
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    /// 如果节点是文本，返回文本内容。
    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// 所有节点 ID，按文档创建顺序排列。
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// 返回第一个符合条件的子元素。
    #[must_use]
    pub fn child_element(&self, id: NodeId, namespace: &str, local_name: &str) -> Option<NodeId> {
        self.child_elements(id, namespace, local_name).next()
    }

    /// 返回所有符合条件的子元素。
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).iter().copied().filter(move |&child| {
            self.element(child)
                .is_some_and(|e| e.is(namespace, local_name))
        })
    }

    /// 按先序遍历返回 `id` 的所有后代（不含自身）。
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// 创建一个尚未挂到树上的节点。
    pub fn create_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// 将 `child` 插入到 `parent` 的第 `index` 个子节点位置。
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.nodes[parent.0].children.len();
        self.insert_child(parent, index, child);
    }

    /// 用新的子节点列表替换 `parent` 的子节点，并更新它们的父指针。
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = children;
    }
}

/// 构建过程中使用的开放元素栈。
#[derive(Debug, Default)]
struct TreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
}

impl TreeBuilder {
    fn push(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn open(&mut self, element: Element) -> CompositorResult<()> {
        let parent = self.stack.last().copied();
        if parent.is_none() && self.root.is_some() {
            return Err(CompositorError::Malformed(format!(
                "根元素之后出现了额外的元素 <{}>",
                element.local_name
            )));
        }
        let id = self.push(NodeData::Element(element), parent);
        if parent.is_none() {
            self.root = Some(id);
        }
        self.stack.push(id);
        Ok(())
    }

    fn close(&mut self) -> CompositorResult<()> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| CompositorError::Malformed("出现了多余的结束标签".to_string()))
    }

    fn text(&mut self, text: &str) -> CompositorResult<()> {
        let Some(&parent) = self.stack.last() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(CompositorError::Malformed(
                "根元素之外出现了文本内容".to_string(),
            ));
        };

        // 实体引用会把文本拆成多个事件，这里把相邻的文本片段合并成一个节点
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeData::Text(existing) = &mut self.nodes[last.0].data
        {
            existing.push_str(text);
            return Ok(());
        }

        if !text.is_empty() {
            self.push(NodeData::Text(text.to_owned()), Some(parent));
        }
        Ok(())
    }

    fn finish(self) -> CompositorResult<Document> {
        if !self.stack.is_empty() {
            return Err(CompositorError::Malformed(format!(
                "文档结束时仍有 {} 个元素未闭合",
                self.stack.len()
            )));
        }
        let root = self
            .root
            .ok_or_else(|| CompositorError::Malformed("文档中没有根元素".to_string()))?;
        Ok(Document {
            nodes: self.nodes,
            root,
        })
    }
}

fn namespace_of(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn read_element(
    reader: &NsReader<&[u8]>,
    e: &BytesStart<'_>,
    namespace: Option<String>,
) -> CompositorResult<Element> {
    let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut element = Element {
        namespace,
        local_name,
        attributes: Vec::new(),
        synthesized: false,
    };

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let namespace = match resolved {
            ResolveResult::Unknown(prefix) if prefix == b"xml" => Some(XML_NAMESPACE.to_owned()),
            other => namespace_of(&other),
        };
        let value = attr.decode_and_unescape_value(reader.decoder())?;
        element.attributes.push(Attribute {
            namespace,
            local_name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: value.into_owned(),
        });
    }

    Ok(element)
}

/// 解码一个 XML 实体引用（`&amp;`、`&#x4E2D;` 等）。
fn decode_entity(entity_name: &str) -> Option<char> {
    if let Some(num_str) = entity_name.strip_prefix('#') {
        let (radix, code_point_str) = num_str
            .strip_prefix('x')
            .map_or((10, num_str), |stripped| (16, stripped));
        return u32::from_str_radix(code_point_str, radix)
            .ok()
            .and_then(char::from_u32);
    }
    match entity_name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTML_NS: &str = "http://www.w3.org/ns/ttml";

    #[test]
    fn test_parse_builds_namespaced_tree() {
        let doc = Document::parse(
            r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:tts="http://www.w3.org/ns/ttml#styling">
                <body><p xml:id="p1" tts:color="red">Hi</p></body>
            </tt>"#,
        )
        .unwrap();

        let root = doc.element(doc.root()).unwrap();
        assert!(root.is(TTML_NS, "tt"));

        let body = doc.child_element(doc.root(), TTML_NS, "body").unwrap();
        let p = doc.child_element(body, TTML_NS, "p").unwrap();
        let p_el = doc.element(p).unwrap();
        assert_eq!(p_el.xml_id(), Some("p1"));
        assert_eq!(
            p_el.attribute(Some("http://www.w3.org/ns/ttml#styling"), "color"),
            Some("red")
        );
        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.text(doc.children(p)[0]), Some("Hi"));
    }

    #[test]
    fn test_entity_references_are_coalesced_into_one_text_node() {
        let doc = Document::parse(r#"<tt xmlns="http://www.w3.org/ns/ttml"><p>A &amp; B &#x4E2D;</p></tt>"#)
            .unwrap();
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text(doc.children(p)[0]), Some("A & B 中"));
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        let result = Document::parse(r#"<tt xmlns="http://www.w3.org/ns/ttml"><body>"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_end_tag_is_an_error() {
        let result = Document::parse(r#"<tt xmlns="http://www.w3.org/ns/ttml"><body></p></tt>"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            Document::parse("   "),
            Err(CompositorError::Malformed(_))
        ));
    }

    #[test]
    fn test_descendants_are_in_document_order() {
        let doc = Document::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter_map(|id| doc.element(id).map(|e| e.local_name.clone()))
            .collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }
}
