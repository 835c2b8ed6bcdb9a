//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `PreparedRgbaImage` 表示已按尺寸上限缩放、可直接编码的 RGBA 数据
//! - `WebpBlob` 表示最终的 WebP 编码结果

use std::path::PathBuf;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 网络地址来源。
    Url(String),
    /// 本地文件路径来源。
    FilePath(PathBuf),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 解码阶段输出：可直接编码的 RGBA 像素数据。
pub(crate) struct PreparedRgbaImage {
    /// 图像宽度（像素）。
    pub(crate) width: u32,
    /// 图像高度（像素）。
    pub(crate) height: u32,
    /// RGBA 字节数组（`width * height * 4`）。
    pub(crate) bytes: Vec<u8>,
}

/// 转换结果：WebP 编码字节及其输出尺寸。
///
/// 内容类型固定为 [`WebpBlob::CONTENT_TYPE`]。
#[derive(Debug, Clone)]
pub struct WebpBlob {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl WebpBlob {
    /// 输出字节对应的 MIME 类型。
    pub const CONTENT_TYPE: &'static str = "image/webp";

    pub(crate) fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self { bytes, width, height }
    }

    /// 输出内容类型，恒为 `image/webp`。
    pub fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }

    /// 编码后的字节内容。
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 取出编码字节的所有权。
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// 编码输出体积（字节）。
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 输出图像宽度（像素）。
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 输出图像高度（像素）。
    pub fn height(&self) -> u32 {
        self.height
    }
}
