//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ConvertConfig`：输出策略（质量、尺寸上限）与
//! 资源防护策略（体积、像素、超时）统一在一处，保证行为可观测、可调整、可测试。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - 上限字段使用 `Option`，`None` 明确表示“不限制”，配置 `Some(0)` 属于非法值，
//!   在构造转换器时被拒绝，而不是被静默当作“未设置”。
//! - `validate` 在 `WebpConverter::new` 中执行，保证运行期配置始终合法。

use image::imageops::FilterType;

use super::ConvertError;

/// 图片转换配置。
///
/// 字段覆盖了输出策略与加载、解码两个阶段的资源防护。
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// 有损 WebP 质量因子，取值范围 `(0, 1]`。
    pub quality: f32,
    /// 输出宽度上限（像素）。`None` 表示不限制。
    pub max_width: Option<u32>,
    /// 输出高度上限（像素）。`None` 表示不限制。
    pub max_height: Option<u32>,
    /// 读取/下载原始字节时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 网络下载总超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接（TCP/TLS）超时时间（秒）。
    pub connect_timeout: u64,
    /// 下载分块读取超时时间（毫秒）。
    pub stream_chunk_timeout_ms: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 降采样滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            quality: 0.8,
            max_width: None,
            max_height: None,
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            stream_chunk_timeout_ms: 15_000,
            max_decoded_pixels: 40_000_000,
            resize_filter: FilterType::Triangle,
        }
    }
}

impl ConvertConfig {
    /// 校验配置合法性。
    ///
    /// 注意 `quality` 为 NaN 时同样会被拒绝（比较结果为 false）。
    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(ConvertError::InvalidFormat(format!(
                "quality 必须在 (0, 1] 区间内：{}",
                self.quality
            )));
        }
        if self.max_width == Some(0) {
            return Err(ConvertError::InvalidFormat(
                "max_width 不能为 0；不限制宽度请使用 None".to_string(),
            ));
        }
        if self.max_height == Some(0) {
            return Err(ConvertError::InvalidFormat(
                "max_height 不能为 0；不限制高度请使用 None".to_string(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ConvertError::InvalidFormat("max_file_size 不能为 0".to_string()));
        }
        if !(1..=300).contains(&self.download_timeout) {
            return Err(ConvertError::InvalidFormat(
                "download_timeout 必须在 1~300 秒之间".to_string(),
            ));
        }
        if !(1..=120).contains(&self.connect_timeout) {
            return Err(ConvertError::InvalidFormat(
                "connect_timeout 必须在 1~120 秒之间".to_string(),
            ));
        }
        if !(500..=120_000).contains(&self.stream_chunk_timeout_ms) {
            return Err(ConvertError::InvalidFormat(
                "stream_chunk_timeout_ms 必须在 500~120000 毫秒之间".to_string(),
            ));
        }
        if self.max_decoded_pixels == 0 {
            return Err(ConvertError::InvalidFormat("max_decoded_pixels 不能为 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ConvertConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_quality() {
        let config = ConvertConfig {
            quality: 0.0,
            ..ConvertConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_quality_above_one() {
        let config = ConvertConfig {
            quality: 1.01,
            ..ConvertConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn rejects_nan_quality() {
        let config = ConvertConfig {
            quality: f32::NAN,
            ..ConvertConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn zero_dimension_cap_is_invalid_not_unset() {
        let config = ConvertConfig {
            max_width: Some(0),
            ..ConvertConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));

        let config = ConvertConfig {
            max_height: Some(0),
            ..ConvertConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn accepts_boundary_quality_values() {
        let config = ConvertConfig {
            quality: 1.0,
            ..ConvertConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = ConvertConfig {
            quality: 0.01,
            ..ConvertConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        let config = ConvertConfig {
            download_timeout: 0,
            ..ConvertConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));

        let config = ConvertConfig {
            stream_chunk_timeout_ms: 100,
            ..ConvertConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConvertError::InvalidFormat(_))));
    }
}
