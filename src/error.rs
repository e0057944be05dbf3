use quick_xml::{
    Error as QuickXmlErrorMain, encoding::EncodingError,
    events::attributes::AttrError as QuickXmlAttrError,
};
use thiserror::Error;

/// 解析字幕文档和构建合成上下文时可能发生的错误。
///
/// 时间表达式解析永远不会产生错误（无法解析的值按 0 处理），
/// 因此这里只包含文档结构和配置层面的失败。
#[derive(Error, Debug)]
pub enum CompositorError {
    /// XML 解析错误，来自 `quick-xml` 库。
    #[error("XML 解析错误: {0}")]
    Xml(#[from] QuickXmlErrorMain),
    /// XML 属性解析错误，来自 `quick-xml` 库。
    #[error("XML 属性错误: {0}")]
    Attribute(#[from] QuickXmlAttrError),
    /// XML 文本编码或解码错误。
    #[error("文本编码或解码错误: {0}")]
    Encoding(#[from] EncodingError),
    /// 输入的字节序列不是有效的 UTF-8。
    #[error("UTF-8 转换错误: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// 文档结构不完整，例如标签未闭合或缺少根元素。
    #[error("文档结构无效: {0}")]
    Malformed(String),
    /// 根元素不是 `<tt>`。
    #[error("无效的根元素: {0}")]
    InvalidRoot(String),
    /// 调用方提供的设置覆盖项无法应用。
    #[error("设置无效: {0}")]
    Settings(#[from] serde_json::Error),
}

/// 本 crate 统一使用的 `Result` 类型。
pub type CompositorResult<T> = std::result::Result<T, CompositorError>;
