//! # 呈现树
//!
//! `get_cues` 输出的轻量节点树，不依赖任何具体的渲染表面。

use std::{collections::BTreeMap, fmt::Write as _};

use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// 呈现节点的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "kebab-case")]
pub enum NodeRole {
    /// 覆盖整个视口的根容器，包裹所有区域。
    RootContainer,
    Region,
    /// 用于垂直对齐的表格包装。
    Table,
    TableCell,
    Block,
    Inline,
    LineBreak,
}

impl NodeRole {
    /// 输出标记时使用的标签名。
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::RootContainer | Self::Region | Self::Table | Self::TableCell | Self::Block => {
                "div"
            }
            Self::Inline => "span",
            Self::LineBreak => "br",
        }
    }
}

/// 呈现树中的一个节点。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PresentationNode {
    Element {
        role: NodeRole,
        attributes: BTreeMap<String, String>,
        /// CSS 属性名到值的映射。
        styles: BTreeMap<String, String>,
        children: Vec<PresentationNode>,
    },
    Text {
        text: String,
    },
}

impl PresentationNode {
    #[must_use]
    pub const fn element(role: NodeRole) -> Self {
        Self::Element {
            role,
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// 元素的角色；文本节点返回 `None`。
    #[must_use]
    pub const fn role(&self) -> Option<NodeRole> {
        match self {
            Self::Element { role, .. } => Some(*role),
            Self::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text { .. } => &[],
        }
    }

    /// 读取一个 CSS 属性。
    #[must_use]
    pub fn style(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { styles, .. } => styles.get(name).map(String::as_str),
            Self::Text { .. } => None,
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Self::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            Self::Text { .. } => None,
        }
    }

    pub(crate) fn set_style(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Self::Element { styles, .. } = self {
            styles.insert(name.into(), value.into());
        }
    }

    pub(crate) fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Self::Element { attributes, .. } = self {
            attributes.insert(name.into(), value.into());
        }
    }

    pub(crate) fn push_child(&mut self, child: Self) {
        if let Self::Element { children, .. } = self {
            children.push(child);
        }
    }

    /// 所有后代文本按顺序拼接的结果。
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(text),
            Self::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// 输出为紧凑的类 HTML 标记。角色写在 `data-role` 属性中，样式写在 `style` 属性中。
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(&escape(text, false)),
            Self::Element {
                role,
                attributes,
                styles,
                children,
            } => {
                let tag = role.tag_name();
                let _ = write!(out, "<{tag} data-role=\"{role}\"");
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"{}\"", escape(value, true));
                }
                if !styles.is_empty() {
                    let css: Vec<String> = styles
                        .iter()
                        .map(|(name, value)| format!("{name}: {value}"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", escape(&css.join("; "), true));
                }

                if *role == NodeRole::LineBreak {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    child.write_markup(out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(text: &str, in_attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if in_attribute => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
