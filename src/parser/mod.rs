//! # TTML (Timed Text Markup Language) 解析器
//!
//! 一次性把原始文档转换为带注解的 [`Context`]：
//! 校验根元素、读取根参数、补全区域、规范化匿名 span、
//! 递归计算时间区间、解析层叠样式，并生成排序去重后的事件列表。
//!
//! 计算结果不写回文档树，而是按节点下标存放在旁路表中。

pub(crate) mod constants;
mod layout;
pub(crate) mod metadata;
mod root;
mod spans;
pub(crate) mod state;
pub(crate) mod styles;
mod timing;
mod utils;

use serde_json::Value;
use tracing::debug;

use self::{
    constants::{END_OF_MEDIA, START_OF_MEDIA, TAG_BODY},
    state::{NodeAnnotation, ParserState, TimingInterval},
};
use crate::{
    compositor::Context,
    document::{Document, NodeId},
    error::CompositorResult,
    settings::Settings,
};

/// 解析 TTML 文本。
///
/// # 参数
///
/// * `content` - TTML 文档内容字符串。
/// * `overrides` - 设置覆盖项（JSON 对象），与默认设置深度合并；`Value::Null` 表示使用默认设置。
///
/// # Errors
///
/// * `CompositorError::Xml` / `CompositorError::Malformed` - 文档不是结构完整的 XML 时
/// * `CompositorError::InvalidRoot` - 根元素不是 `<tt>` 时
/// * `CompositorError::Settings` - 覆盖项的结构与设置不匹配时
pub fn parse_ttml(content: &str, overrides: &Value) -> CompositorResult<Context> {
    let settings = Settings::with_overrides(overrides)?;
    let document = Document::parse(content)?;
    parse_document(document, settings)
}

/// 解析 UTF-8 编码的 TTML 字节。
///
/// # Errors
///
/// 与 [`parse_ttml`] 相同，另外在字节不是合法 UTF-8 时返回 `CompositorError::Utf8`。
pub fn parse_ttml_bytes(bytes: &[u8], overrides: &Value) -> CompositorResult<Context> {
    let settings = Settings::with_overrides(overrides)?;
    let document = Document::from_bytes(bytes)?;
    parse_document(document, settings)
}

/// 处理一棵已经构建好的文档树。
///
/// # Errors
///
/// 根元素不是 `<tt>` 时返回 `CompositorError::InvalidRoot`。
pub fn parse_document(mut document: Document, mut settings: Settings) -> CompositorResult<Context> {
    root::verify_root(&document, &mut settings)?;
    root::parse_root_attributes(&document, &mut settings);

    let ttml_ns = settings.namespaces.ttml.clone();
    let regions = layout::ensure_regions(&mut document, &ttml_ns);
    spans::normalize_anonymous_spans(&mut document, &ttml_ns);

    let mut state = ParserState::new(settings);
    state.annotations = vec![NodeAnnotation::default(); document.len()];

    match document.child_element(document.root(), &ttml_ns, TAG_BODY) {
        Some(body) if has_text_content(&document, body) => {
            timing::compute_intervals(
                &document,
                &mut state,
                body,
                TimingInterval::new(START_OF_MEDIA, END_OF_MEDIA),
                true,
            );
            state.record_event(END_OF_MEDIA, document.root());
        }
        Some(_) => debug!("<body> 中没有文本内容"),
        None => debug!("文档没有 <body>"),
    }

    styles::resolve_styles(&document, &mut state);
    let metadata = metadata::extract_metadata(&document, &state.settings.namespaces);

    let events = state.take_events();
    let ParserState {
        settings,
        annotations,
        style_cache,
        ..
    } = state;
    let styles = style_cache.into_styles();

    debug!(
        nodes = document.len(),
        events = events.len(),
        styles = styles.len(),
        regions = regions.len(),
        "TTML 解析完成"
    );

    Ok(Context::new(
        document,
        settings,
        annotations,
        events,
        styles,
        regions,
        metadata,
    ))
}

fn has_text_content(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node)
        .into_iter()
        .filter_map(|n| doc.text(n))
        .any(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompositorError;

    #[test]
    fn test_events_are_sorted_and_end_with_sentinel() {
        let context = parse_ttml(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"><body>
                <div>
                    <p begin="2s" end="3s">second</p>
                    <p begin="1s" end="2s">first</p>
                    <p begin="1s" end="4s">also first</p>
                </div>
            </body></tt>"#,
            &Value::Null,
        )
        .unwrap();

        let times: Vec<i64> = context.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![1000, 2000, END_OF_MEDIA]);
        assert!(context.has_events());
    }

    #[test]
    fn test_missing_body_is_not_an_error() {
        let context =
            parse_ttml(r#"<tt xmlns="http://www.w3.org/ns/ttml"><head/></tt>"#, &Value::Null)
                .unwrap();
        assert!(!context.has_events());
        assert!(context.events().is_empty());
    }

    #[test]
    fn test_body_without_text_has_no_events() {
        let context = parse_ttml(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><div begin="1s"><p/></div></body></tt>"#,
            &Value::Null,
        )
        .unwrap();
        assert!(!context.has_events());
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let result = parse_ttml(r#"<html xmlns="http://www.w3.org/ns/ttml"/>"#, &Value::Null);
        assert!(matches!(result, Err(CompositorError::InvalidRoot(_))));
    }

    #[test]
    fn test_malformed_markup_is_a_hard_failure() {
        let result = parse_ttml(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"><body><p>x</body></tt>"#,
            &Value::Null,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_root_tick_rate_is_used_for_timing() {
        let context = parse_ttml(
            r#"<tt xmlns="http://www.w3.org/ns/ttml"
                   xmlns:ttp="http://www.w3.org/ns/ttml#parameter"
                   ttp:tickRate="10000000">
                <body><p begin="20000000t" end="30000000t">tick</p></body>
            </tt>"#,
            &Value::Null,
        )
        .unwrap();
        let times: Vec<i64> = context.events().iter().map(|e| e.time).collect();
        assert_eq!(times, vec![2000, END_OF_MEDIA]);
    }
}
