//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载转换链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 图片转换统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// 输入的内容类型不是图片。
    ///
    /// 在任何解码动作发生之前同步检出；消息文本属于对外契约，保持英文原样。
    #[error("Invalid file type. Only images are supported.")]
    InvalidInput,

    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("编码错误：{0}")]
    Encode(String),
}
