//! # TTML 解析器 - 样式层叠
//!
//! 为每个元素合并样式：优先级从低到高依次是
//! 1. `style` 属性引用的命名样式（空白分隔的 ID 列表，靠前的优先级更低，
//!    每个命名样式本身也可以继续引用其他样式）；
//! 2. 区域内嵌的 `<style>` 子元素（仅对 `<region>`）；
//! 3. 元素自身的 `tts:*` 属性。
//!
//! 不适用于该元素标签的属性在层叠阶段就被丢弃。

use std::collections::{HashMap, HashSet};

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, warn};

use super::{
    constants::{
        ATTR_STYLE, TAG_BODY, TAG_BR, TAG_DIV, TAG_HEAD, TAG_P, TAG_REGION, TAG_SPAN, TAG_STYLE,
        TAG_STYLING, TAG_TT,
    },
    state::{ParserState, StyleSet},
    utils::get_plain_attribute,
};
use crate::document::{Document, Element, NodeId};

/// 合成器认识的样式属性。名称与 `tts:*` 属性的本地名一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum StyleProperty {
    BackgroundColor,
    Color,
    Direction,
    Display,
    DisplayAlign,
    Extent,
    FontFamily,
    FontSize,
    FontStyle,
    FontWeight,
    LineHeight,
    Opacity,
    Origin,
    Overflow,
    Padding,
    ShowBackground,
    TextAlign,
    TextDecoration,
    TextOutline,
    UnicodeBidi,
    Visibility,
    WrapOption,
    WritingMode,
    ZIndex,
}

const CONTENT_BLOCKS: &[&str] = &[TAG_BODY, TAG_DIV, TAG_P, TAG_SPAN, TAG_REGION];
const TEXT_ELEMENTS: &[&str] = &[TAG_P, TAG_SPAN, TAG_BR];
const REGION_ONLY: &[&str] = &[TAG_REGION];

impl StyleProperty {
    /// 该属性适用的标签。`tt` 代表根容器区域。
    #[must_use]
    pub const fn applicable_tags(self) -> &'static [&'static str] {
        match self {
            Self::BackgroundColor | Self::Display => CONTENT_BLOCKS,
            Self::Color
            | Self::Direction
            | Self::FontFamily
            | Self::FontSize
            | Self::FontStyle
            | Self::FontWeight
            | Self::TextDecoration
            | Self::TextOutline
            | Self::UnicodeBidi
            | Self::WrapOption => TEXT_ELEMENTS,
            Self::LineHeight | Self::TextAlign => &[TAG_P],
            Self::Extent => &[TAG_TT, TAG_REGION],
            Self::Visibility => &[TAG_BODY, TAG_DIV, TAG_P, TAG_SPAN, TAG_BR, TAG_REGION],
            Self::DisplayAlign
            | Self::Opacity
            | Self::Origin
            | Self::Overflow
            | Self::Padding
            | Self::ShowBackground
            | Self::WritingMode
            | Self::ZIndex => REGION_ONLY,
        }
    }

    /// 该属性是否适用于给定标签。
    #[must_use]
    pub fn applies_to(self, tag: &str) -> bool {
        self.applicable_tags().contains(&tag)
    }

    /// 该属性是否会从父元素向子元素传递。区域专用的属性不会被继承。
    #[must_use]
    pub const fn is_inheritable(self) -> bool {
        !matches!(
            self,
            Self::BackgroundColor
                | Self::Display
                | Self::DisplayAlign
                | Self::Extent
                | Self::Opacity
                | Self::Origin
                | Self::Overflow
                | Self::Padding
                | Self::ShowBackground
                | Self::WritingMode
                | Self::ZIndex
        )
    }
}

/// 判断属性名是否适用于标签。不认识的属性名原样保留。
#[must_use]
pub fn property_applies(name: &str, tag: &str) -> bool {
    name.parse::<StyleProperty>()
        .map_or(true, |p| p.applies_to(tag))
}

/// 取出样式集中可继承的部分。
#[must_use]
pub fn inheritable_subset(set: &StyleSet) -> StyleSet {
    set.iter()
        .filter(|(name, _)| {
            name.parse::<StyleProperty>()
                .is_ok_and(StyleProperty::is_inheritable)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// 命名样式的解析器，带记忆化和循环检测。
struct StyleResolver<'a> {
    doc: &'a Document,
    styling_ns: &'a str,
    definitions: HashMap<&'a str, NodeId>,
    resolved: HashMap<NodeId, StyleSet>,
    visiting: HashSet<NodeId>,
}

impl<'a> StyleResolver<'a> {
    fn new(doc: &'a Document, ttml_ns: &str, styling_ns: &'a str) -> Self {
        let mut definitions = HashMap::new();
        if let Some(head) = doc.child_element(doc.root(), ttml_ns, TAG_HEAD) {
            for styling in doc.child_elements(head, ttml_ns, TAG_STYLING) {
                for style in doc.child_elements(styling, ttml_ns, TAG_STYLE) {
                    if let Some(id) = doc.element(style).and_then(Element::xml_id) {
                        definitions.entry(id).or_insert(style);
                    }
                }
            }
        }

        Self {
            doc,
            styling_ns,
            definitions,
            resolved: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// 按优先级从低到高合并 `node` 的 `style` 属性引用的命名样式。
    fn merge_references(&mut self, node: NodeId, target: &mut StyleSet) {
        let Some(references) = get_plain_attribute(self.doc, node, ATTR_STYLE) else {
            return;
        };
        for id in references.split_whitespace() {
            match self.definitions.get(id).copied() {
                Some(definition) => {
                    let set = self.resolve_definition(definition);
                    target.extend(set);
                }
                None => warn!(style_id = %id, "引用了不存在的样式"),
            }
        }
    }

    fn resolve_definition(&mut self, definition: NodeId) -> StyleSet {
        if let Some(set) = self.resolved.get(&definition) {
            return set.clone();
        }
        if !self.visiting.insert(definition) {
            warn!(node = definition.index(), "样式引用出现循环，已截断");
            return StyleSet::new();
        }

        let mut set = StyleSet::new();
        self.merge_references(definition, &mut set);
        self.merge_inline(definition, &mut set);

        self.visiting.remove(&definition);
        self.resolved.insert(definition, set.clone());
        set
    }

    /// 合并元素自身的 `tts:*` 属性。
    fn merge_inline(&self, node: NodeId, target: &mut StyleSet) {
        let Some(element) = self.doc.element(node) else {
            return;
        };
        for attr in &element.attributes {
            if attr.namespace.as_deref() == Some(self.styling_ns) {
                target.insert(attr.local_name.clone(), attr.value.clone());
            }
        }
    }
}

/// 为文档中的每个元素计算层叠样式，并把非空结果存入共享缓存。
pub(super) fn resolve_styles(doc: &Document, state: &mut ParserState) {
    let ttml_ns = state.settings.namespaces.ttml.clone();
    let styling_ns = state.settings.namespaces.styling.clone();
    let mut resolver = StyleResolver::new(doc, &ttml_ns, &styling_ns);

    let mut styled = 0usize;
    for node in doc.node_ids() {
        let Some(element) = doc.element(node) else {
            continue;
        };

        let mut set = StyleSet::new();
        resolver.merge_references(node, &mut set);

        if element.is(&ttml_ns, TAG_REGION) {
            for nested in doc.child_elements(node, &ttml_ns, TAG_STYLE) {
                resolver.merge_references(nested, &mut set);
                resolver.merge_inline(nested, &mut set);
            }
        }

        resolver.merge_inline(node, &mut set);
        set.retain(|name, _| property_applies(name, &element.local_name));

        let index = state.style_cache.intern(set);
        if index.is_some() {
            styled += 1;
        }
        state.annotation_mut(node).style_index = index;
    }

    debug!(
        styled_elements = styled,
        definitions = resolver.definitions.len(),
        "样式层叠完成"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn resolve(xml: &str) -> (Document, ParserState) {
        let doc = Document::parse(xml).unwrap();
        let mut state = ParserState::new(Settings::default());
        state.annotations = vec![Default::default(); doc.len()];
        resolve_styles(&doc, &mut state);
        (doc, state)
    }

    fn style_of(doc: &Document, state: &ParserState, id: &str) -> Option<StyleSet> {
        let node = doc
            .node_ids()
            .find(|&n| doc.element(n).and_then(Element::xml_id) == Some(id))?;
        let index = state.annotations[node.index()].style_index?;
        state.style_cache.get(index).cloned()
    }

    const DOC: &str = r#"<tt xmlns="http://www.w3.org/ns/ttml" xmlns:tts="http://www.w3.org/ns/ttml#styling">
        <head>
            <styling>
                <style xml:id="base" tts:color="white" tts:fontSize="1c"/>
                <style xml:id="yellow" style="base" tts:color="yellow"/>
                <style xml:id="loopA" style="loopB" tts:fontStyle="italic"/>
                <style xml:id="loopB" style="loopA" tts:fontWeight="bold"/>
            </styling>
            <layout>
                <region xml:id="r1" tts:origin="10% 80%" tts:color="red">
                    <style tts:backgroundColor="black"/>
                </region>
            </layout>
        </head>
        <body xml:id="body" tts:fontSize="2c">
            <div xml:id="div" tts:backgroundColor="blue"/>
            <p xml:id="p1" style="base yellow" tts:fontWeight="bold"/>
            <p xml:id="p2" style="yellow" tts:color="green"/>
            <p xml:id="p3" style="loopA"/>
            <p xml:id="p4" style="missing"/>
            <p xml:id="p5" tts:foo="bar"/>
            <p xml:id="p6"/>
        </body>
    </tt>"#;

    #[test]
    fn test_referenced_styles_cascade_below_inline_attributes() {
        let (doc, state) = resolve(DOC);
        let p1 = style_of(&doc, &state, "p1").unwrap();
        assert_eq!(p1["color"], "yellow", "后引用的样式优先级更高");
        assert_eq!(p1["fontSize"], "1c", "链式引用的样式应被合并");
        assert_eq!(p1["fontWeight"], "bold");

        let p2 = style_of(&doc, &state, "p2").unwrap();
        assert_eq!(p2["color"], "green", "内联属性优先级最高");
    }

    #[test]
    fn test_inapplicable_properties_are_dropped_during_cascade() {
        let (doc, state) = resolve(DOC);
        assert_eq!(style_of(&doc, &state, "body"), None, "fontSize 不适用于 body");

        let div = style_of(&doc, &state, "div").unwrap();
        assert_eq!(div["backgroundColor"], "blue");

        let region = style_of(&doc, &state, "r1").unwrap();
        assert_eq!(region["origin"], "10% 80%");
        assert_eq!(region["backgroundColor"], "black", "区域内嵌样式应被合并");
        assert!(!region.contains_key("color"), "color 不适用于 region");
    }

    #[test]
    fn test_cycles_and_missing_references_are_tolerated() {
        let (doc, state) = resolve(DOC);
        let p3 = style_of(&doc, &state, "p3").unwrap();
        assert_eq!(p3["fontStyle"], "italic");
        assert_eq!(p3["fontWeight"], "bold");
        assert_eq!(style_of(&doc, &state, "p4"), None);
    }

    #[test]
    fn test_unknown_properties_pass_through_and_empty_sets_have_no_index() {
        let (doc, state) = resolve(DOC);
        assert_eq!(style_of(&doc, &state, "p5").unwrap()["foo"], "bar");

        let p6 = doc
            .node_ids()
            .find(|&n| doc.element(n).and_then(Element::xml_id) == Some("p6"))
            .unwrap();
        assert_eq!(state.annotations[p6.index()].style_index, None);
    }

    #[test]
    fn test_property_table() {
        assert!(StyleProperty::FontSize.applies_to(TAG_SPAN));
        assert!(!StyleProperty::FontSize.applies_to(TAG_DIV));
        assert!(StyleProperty::Extent.applies_to(TAG_TT));
        assert!(!StyleProperty::Origin.applies_to(TAG_P));
        assert!(property_applies("someVendorThing", TAG_DIV));
        assert_eq!(StyleProperty::ZIndex.as_ref(), "zIndex");
        assert_eq!(
            "backgroundColor".parse::<StyleProperty>().unwrap(),
            StyleProperty::BackgroundColor
        );
        assert!(!StyleProperty::BackgroundColor.is_inheritable());
        assert!(StyleProperty::Color.is_inheritable());
    }

    #[test]
    fn test_default_region_style_covers_every_property() {
        use strum::IntoEnumIterator;

        let settings = Settings::default();
        for property in StyleProperty::iter() {
            assert!(
                settings
                    .default_region_style
                    .contains_key(property.as_ref()),
                "默认区域样式缺少 {property}"
            );
            assert!(!property.applicable_tags().is_empty());
        }
    }
}
