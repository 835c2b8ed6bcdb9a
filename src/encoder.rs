//! # WebP 编码模块
//!
//! ## 设计思路
//!
//! 编码阶段只做一件事：把流水线产出的 RGBA 数据按配置质量序列化为有损 WebP。
//! 序列化失败（包括退化的零尺寸输入与空输出）必须以错误返回，
//! 而不是让调用方悬挂等待一个永远不会出现的结果。

use webp::{Encoder, PixelLayout};

use super::source::{PreparedRgbaImage, WebpBlob};
use super::{ConvertError, WebpConverter};

impl WebpConverter {
    /// 将 RGBA 数据编码为有损 WebP。
    ///
    /// 配置的 `quality ∈ (0, 1]` 映射到编码器的 0~100 质量标度。
    pub(crate) fn encode_webp(
        &self,
        prepared: PreparedRgbaImage,
    ) -> Result<WebpBlob, ConvertError> {
        let PreparedRgbaImage {
            width,
            height,
            bytes,
        } = prepared;

        if width == 0 || height == 0 {
            return Err(ConvertError::Encode("目标尺寸为零，无法编码".to_string()));
        }

        let quality = (self.config.quality * 100.0).clamp(1.0, 100.0);

        let encoder = Encoder::new(&bytes, PixelLayout::Rgba, width, height);
        let memory = encoder
            .encode_simple(false, quality)
            .map_err(|e| ConvertError::Encode(format!("WebP 编码失败：{:?}", e)))?;

        let output = memory.to_vec();
        if output.is_empty() {
            return Err(ConvertError::Encode("WebP 编码输出为空".to_string()));
        }

        log::debug!(
            "🎨 WebP 编码完成 - {}x{} quality={} 输出 {}KB",
            width,
            height,
            quality,
            output.len() / 1024
        );

        Ok(WebpBlob::new(output, width, height))
    }
}
