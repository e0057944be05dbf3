//! # 字幕构建
//!
//! 为给定时间构建呈现树：
//! 1. 每个区域翻译为一个绝对定位的区域节点，需要垂直居中或靠底时包一层表格结构；
//! 2. 从 `<body>` 开始只沿激活的元素向下，把有效区域等于当前区域的内容剪裁出来。
//!    有效区域依次取元素自身的 `region`、最近祖先的区域；都没有时由后代决定。
//!    祖先链会被保留以维持块级与行内的嵌套关系，但不包含未激活的兄弟内容；
//! 3. 没有内容的区域被丢弃，除非它自身声明了 `showBackground="always"`；
//! 4. 所有区域包进一个覆盖视口的根容器节点。

use tracing::trace;

use super::{
    Context,
    node::{NodeRole, PresentationNode},
    translate::{CssMap, Translator},
    units::UnitResolver,
};
use crate::{
    document::{NodeId, XML_NAMESPACE},
    parser::{
        constants::{
            ATTR_REGION, ATTR_SPACE, SPACE_PRESERVE, TAG_BR, TAG_P, TAG_REGION, TAG_SPAN,
        },
        state::StyleSet,
        styles::{StyleProperty, inheritable_subset, property_applies},
    },
    settings::Dimensions,
};

const SHOW_BACKGROUND: &str = "showBackground";
const SHOW_BACKGROUND_ALWAYS: &str = "always";
const DISPLAY_ALIGN: &str = "displayAlign";

/// 沿树向下传递的继承状态。
#[derive(Debug, Clone, Default)]
struct Scope<'a> {
    /// 可继承的已计算样式。
    styles: StyleSet,
    /// 祖先节点已经输出过的可继承样式，相同的值不再重复输出。
    emitted: StyleSet,
    region: Option<&'a str>,
    preserve_space: bool,
}

/// 剪裁结果。`visible` 为假表示子树只有可折叠的空白。
struct Pruned {
    node: PresentationNode,
    visible: bool,
}

pub(super) struct CueBuilder<'a> {
    context: &'a Context,
    time: i64,
    units: UnitResolver,
}

impl<'a> CueBuilder<'a> {
    pub(super) fn new(context: &'a Context, time: i64) -> Self {
        Self {
            context,
            time,
            units: UnitResolver::from_settings(context.settings()),
        }
    }

    pub(super) fn build(&self) -> Vec<PresentationNode> {
        let regions: Vec<PresentationNode> = self
            .context
            .regions()
            .iter()
            .filter_map(|&region| self.build_region(region))
            .collect();

        if regions.is_empty() {
            return Vec::new();
        }

        let mut root = PresentationNode::element(NodeRole::RootContainer);
        let viewport = self.units.viewport();
        root.set_style("position", "absolute");
        root.set_style("left", "0px");
        root.set_style("top", "0px");
        root.set_style("width", viewport_length(viewport.width));
        root.set_style("height", viewport_length(viewport.height));
        root.set_style("overflow", "hidden");
        for region in regions {
            root.push_child(region);
        }
        vec![root]
    }

    fn build_region(&self, region: NodeId) -> Option<PresentationNode> {
        let doc = self.context.document();
        let id = doc.element(region)?.xml_id()?;
        let own = self.context.style_of(region);

        let mut computed = self.context.settings().default_region_style.clone();
        if let Some(own) = own {
            computed.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let scope = Scope {
            styles: inheritable_subset(&computed),
            ..Scope::default()
        };
        let content = self
            .context
            .body()
            .and_then(|body| self.prune(body, &scope, id))
            .filter(|pruned| pruned.visible)
            .map(|pruned| pruned.node);

        let always_show = own
            .and_then(|s| s.get(SHOW_BACKGROUND))
            .is_some_and(|v| v == SHOW_BACKGROUND_ALWAYS);
        if content.is_none() && !always_show {
            return None;
        }

        let mut node = PresentationNode::element(NodeRole::Region);
        node.set_attribute("id", id);
        for (name, value) in self.region_css(&computed) {
            node.set_style(name, value);
        }
        node.set_style("position", "absolute");
        node.set_style("box-sizing", "border-box");

        if let Some(content) = content {
            let vertical_align = match computed.get(DISPLAY_ALIGN).map(String::as_str) {
                Some("center") => Some("middle"),
                Some("after") => Some("bottom"),
                _ => None,
            };
            match vertical_align {
                Some(align) => {
                    let mut cell = PresentationNode::element(NodeRole::TableCell);
                    cell.set_style("display", "table-cell");
                    cell.set_style("vertical-align", align);
                    cell.push_child(content);

                    let mut table = PresentationNode::element(NodeRole::Table);
                    table.set_style("display", "table");
                    table.set_style("width", "100%");
                    table.set_style("height", "100%");
                    table.push_child(cell);
                    node.push_child(table);
                }
                None => node.push_child(content),
            }
        }

        trace!(region = id, time = self.time, "区域已构建");
        Some(node)
    }

    /// 区域自身的几何与外观。内边距的百分比相对于区域自身的尺寸。
    fn region_css(&self, computed: &StyleSet) -> CssMap {
        let region_style: StyleSet = computed
            .iter()
            .filter(|(name, _)| property_applies(name, TAG_REGION))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let translator = self.translator(None);
        let mut css = translator.translate_all(&region_style);

        if let Some(padding) = region_style.get("padding") {
            let viewport = self.units.viewport();
            let region_box = Dimensions::new(
                px_or(css.get("width"), viewport.width),
                px_or(css.get("height"), viewport.height),
            );
            self.translator(Some(region_box))
                .translate("padding", padding, &region_style, &mut css);
        }
        css
    }

    fn translator(&self, containing: Option<Dimensions>) -> Translator<'a> {
        Translator {
            font_map: &self.context.settings().font_map,
            units: self.units,
            containing,
        }
    }

    /// 剪裁 `node` 及其后代中属于 `target` 区域、在当前时间激活的内容。
    fn prune(&self, node: NodeId, scope: &Scope<'a>, target: &str) -> Option<Pruned> {
        let doc = self.context.document();
        let element = doc.element(node)?;

        if !self
            .context
            .interval_of(node)
            .is_some_and(|interval| interval.contains(self.time))
        {
            return None;
        }

        let region = element
            .attribute(None, ATTR_REGION)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or(scope.region);
        // 属于其他区域的祖先仍然要向下遍历，显式指定了目标区域的后代需要它作为包装
        let in_target = region == Some(target);

        let mut computed = scope.styles.clone();
        if let Some(own) = self.context.style_of(node) {
            computed.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if computed.get("display").is_some_and(|d| d == "none") {
            return None;
        }

        let tag = element.local_name.as_str();
        let preserve_space = match element.attribute(Some(XML_NAMESPACE), ATTR_SPACE) {
            Some(space) => space.trim() == SPACE_PRESERVE,
            None => scope.preserve_space,
        };

        let role = match tag {
            TAG_SPAN => NodeRole::Inline,
            TAG_BR => NodeRole::LineBreak,
            _ => NodeRole::Block,
        };
        let mut output = PresentationNode::element(role);

        let translator = self.translator(None);
        let mut css = CssMap::new();
        let mut child_emitted = scope.emitted.clone();
        for (name, value) in &computed {
            if !property_applies(name, tag) || scope.emitted.get(name) == Some(value) {
                continue;
            }
            translator.translate(name, value, &computed, &mut css);
            if is_inheritable(name) {
                child_emitted.insert(name.clone(), value.clone());
            }
        }
        if preserve_space != scope.preserve_space {
            let white_space = match (preserve_space, computed.get("wrapOption")) {
                (true, Some(wrap)) if wrap == "noWrap" => "pre",
                (true, _) => "pre-wrap",
                (false, _) => "normal",
            };
            css.insert("white-space".to_owned(), white_space.to_owned());
        }
        for (name, value) in css {
            output.set_style(name, value);
        }
        if let Some(lang) = element.attribute(Some(XML_NAMESPACE), "lang") {
            output.set_attribute("lang", lang);
        }

        if role == NodeRole::LineBreak {
            return in_target.then_some(Pruned {
                node: output,
                visible: true,
            });
        }

        let child_scope = Scope {
            styles: inheritable_subset(&computed),
            emitted: child_emitted,
            region,
            preserve_space,
        };

        // 行内上下文里的空白会影响词间距，块级容器里只含空白的子树直接丢弃
        let inline_context = matches!(tag, TAG_P | TAG_SPAN);
        let mut has_content = false;
        let mut visible = false;
        for &child in doc.children(node) {
            if let Some(text) = doc.text(child) {
                if in_target {
                    output.push_child(PresentationNode::text(text));
                    has_content = true;
                    visible |= preserve_space || !text.trim().is_empty();
                }
            } else if let Some(pruned) = self
                .prune(child, &child_scope, target)
                .filter(|pruned| pruned.visible || inline_context)
            {
                output.push_child(pruned.node);
                has_content = true;
                visible |= pruned.visible;
            }
        }

        has_content.then_some(Pruned {
            node: output,
            visible,
        })
    }
}

/// 只有可继承的属性会沿输出树传递，其余属性每个节点都要单独输出。
fn is_inheritable(name: &str) -> bool {
    name.parse::<StyleProperty>()
        .is_ok_and(StyleProperty::is_inheritable)
}

fn viewport_length(value: f64) -> String {
    if value > 0.0 {
        format!("{value}px")
    } else {
        "100%".to_owned()
    }
}

fn px_or(value: Option<&String>, fallback: f64) -> f64 {
    value
        .and_then(|v| v.strip_suffix("px"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}
