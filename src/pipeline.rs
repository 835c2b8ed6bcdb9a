//! # 解码与变换流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限快速拒绝
//! 3. 完整解码
//! 4. 按宽高上限一次性计算缩放比例并降采样
//! 5. 转换 RGBA，并校验字节长度一致性
//!
//! 尺寸上限采用单次缩放：`scale = min(1, max_width/w, max_height/h)`，
//! 一次应用即可同时满足两个上限并保持宽高比，不存在两次串行收缩后
//! 第一个上限被二次破坏的问题。

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use std::io::Cursor;

use super::source::{PreparedRgbaImage, RawImageData};
use super::{ConvertError, WebpConverter};

impl WebpConverter {
    /// 将原始字节解码并缩放为可编码的 RGBA 数据。
    pub(crate) fn decode_and_resize(
        &self,
        raw: RawImageData,
    ) -> Result<PreparedRgbaImage, ConvertError> {
        let config = &self.config;

        image::guess_format(&raw.bytes)
            .map_err(|e| ConvertError::InvalidFormat(format!("不支持的图片格式：{}", e)))?;

        let (header_width, header_height) = Self::inspect_dimensions_from_memory(&raw.bytes)?;
        Self::validate_pixel_limits(config.max_decoded_pixels, header_width, header_height)?;

        let decoded = image::load_from_memory(&raw.bytes)
            .map_err(|e| ConvertError::Decode(format!("图片解码失败：{}", e)))?;

        let (native_width, native_height) = decoded.dimensions();
        if native_width == 0 || native_height == 0 {
            return Err(ConvertError::Decode("图片尺寸为零".to_string()));
        }
        Self::validate_pixel_limits(config.max_decoded_pixels, native_width, native_height)?;

        let (target_width, target_height) = Self::target_dimensions(
            native_width,
            native_height,
            config.max_width,
            config.max_height,
        );

        let resized = if (target_width, target_height) == (native_width, native_height) {
            decoded
        } else {
            log::info!(
                "🧩 按尺寸上限降采样：{}x{} -> {}x{}（filter={:?}）",
                native_width,
                native_height,
                target_width,
                target_height,
                config.resize_filter
            );

            match Self::resize_with_fast_image_resize(
                &decoded,
                target_width,
                target_height,
                config.resize_filter,
            ) {
                Ok(resized) => resized,
                Err(err) => {
                    log::warn!(
                        "⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}",
                        err
                    );
                    decoded.resize_exact(target_width, target_height, config.resize_filter)
                }
            }
        };

        let (width, height) = resized.dimensions();
        let rgba = resized.to_rgba8();
        let bytes = rgba.into_raw();

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| ConvertError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))?;

        if bytes.len() != expected_len {
            return Err(ConvertError::Decode("解码后像素数据长度异常".to_string()));
        }

        log::info!(
            "✅ 图片解码成功 - 来源: {} 原始尺寸: {}x{} 输出尺寸: {}x{}",
            raw.source_hint,
            native_width,
            native_height,
            width,
            height
        );

        Ok(PreparedRgbaImage {
            width,
            height,
            bytes,
        })
    }

    /// 按宽高上限计算目标尺寸。
    ///
    /// 单次缩放：取 `min(1, max_width/w, max_height/h)` 作为统一比例，
    /// 保证两个上限同时成立且保持宽高比；不超限时原样返回（不放大）。
    /// 结果四舍五入并保底 1 像素。
    pub(crate) fn target_dimensions(
        width: u32,
        height: u32,
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> (u32, u32) {
        let mut scale = 1.0_f64;

        if let Some(max_w) = max_width {
            if width > max_w {
                scale = scale.min(max_w as f64 / width as f64);
            }
        }
        if let Some(max_h) = max_height {
            if height > max_h {
                scale = scale.min(max_h as f64 / height as f64);
            }
        }

        if scale >= 1.0 {
            return (width, height);
        }

        let target_width = ((width as f64 * scale).round() as u32).max(1);
        let target_height = ((height as f64 * scale).round() as u32).max(1);

        (target_width, target_height)
    }

    /// 仅通过内存中的图片头信息读取宽高。
    ///
    /// 用于在完整解码前做像素限制检查。
    fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ConvertError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ConvertError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

        reader
            .into_dimensions()
            .map_err(|e| ConvertError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
    }

    /// 校验像素数量是否超过配置上限。
    fn validate_pixel_limits(
        max_decoded_pixels: u64,
        width: u32,
        height: u32,
    ) -> Result<(), ConvertError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ConvertError::ResourceLimit("图片像素数溢出".to_string()))?;

        if pixels > max_decoded_pixels {
            return Err(ConvertError::ResourceLimit(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, max_decoded_pixels
            )));
        }

        Ok(())
    }

    fn resize_with_fast_image_resize(
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
        filter: image::imageops::FilterType,
    ) -> Result<DynamicImage, ConvertError> {
        let src = image.to_rgba8();
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.into_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ConvertError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image =
            fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(Self::to_fast_filter(filter)));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ConvertError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

        let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
            target_width,
            target_height,
            dst_image.into_vec(),
        )
        .ok_or_else(|| ConvertError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn to_fast_filter(filter: image::imageops::FilterType) -> fr::FilterType {
        match filter {
            image::imageops::FilterType::Nearest => fr::FilterType::Box,
            image::imageops::FilterType::Triangle => fr::FilterType::Bilinear,
            image::imageops::FilterType::CatmullRom => fr::FilterType::CatmullRom,
            image::imageops::FilterType::Gaussian => fr::FilterType::Mitchell,
            image::imageops::FilterType::Lanczos3 => fr::FilterType::Lanczos3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvertConfig;
    use image::ImageFormat;
    use proptest::prelude::*;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn converter_with(config: ConvertConfig) -> WebpConverter {
        WebpConverter::new(config).expect("converter init failed")
    }

    #[test]
    fn target_dimensions_without_caps_is_identity() {
        assert_eq!(
            WebpConverter::target_dimensions(800, 600, None, None),
            (800, 600)
        );
    }

    #[test]
    fn target_dimensions_does_not_upscale() {
        assert_eq!(
            WebpConverter::target_dimensions(320, 240, Some(1920), Some(1080)),
            (320, 240)
        );
    }

    #[test]
    fn width_cap_scales_height_proportionally() {
        // 输出高度 = round(600 * 400 / 800) = 300
        assert_eq!(
            WebpConverter::target_dimensions(800, 600, Some(400), None),
            (400, 300)
        );
    }

    #[test]
    fn height_cap_scales_width_proportionally() {
        assert_eq!(
            WebpConverter::target_dimensions(800, 600, None, Some(300)),
            (400, 300)
        );
    }

    #[test]
    fn both_caps_are_respected_simultaneously() {
        // 串行收缩会先得到 500x375，再被 maxHeight=100 压到 133x100；
        // 单次缩放直接取最小比例，宽度不会超过 500 的同时也满足 100 的高度上限。
        let (w, h) = WebpConverter::target_dimensions(1000, 750, Some(500), Some(100));

        assert!(w <= 500);
        assert!(h <= 100);
        assert_eq!((w, h), (133, 100));
    }

    #[test]
    fn aspect_ratio_is_preserved_within_epsilon() {
        let (w, h) = WebpConverter::target_dimensions(1920, 1080, Some(1280), None);

        let native_ratio = 1920.0 / 1080.0;
        let target_ratio = w as f64 / h as f64;
        assert!((native_ratio - target_ratio).abs() < 0.01);
        assert_eq!((w, h), (1280, 720));
    }

    #[test]
    fn tiny_results_floor_at_one_pixel() {
        let (w, h) = WebpConverter::target_dimensions(10_000, 2, Some(10), None);

        assert!(w >= 1 && h >= 1);
        assert_eq!(w, 10);
    }

    #[test]
    fn decode_keeps_dimensions_when_no_caps() {
        let converter = converter_with(ConvertConfig::default());
        let png = create_png_bytes(64, 48);

        let prepared = converter
            .decode_and_resize(RawImageData {
                bytes: png,
                source_hint: "test",
            })
            .expect("decode pipeline should succeed");

        assert_eq!((prepared.width, prepared.height), (64, 48));
        assert_eq!(prepared.bytes.len(), 64 * 48 * 4);
    }

    #[test]
    fn decode_downscales_to_width_cap() {
        let converter = converter_with(ConvertConfig {
            max_width: Some(100),
            ..ConvertConfig::default()
        });
        let png = create_png_bytes(200, 150);

        let prepared = converter
            .decode_and_resize(RawImageData {
                bytes: png,
                source_hint: "test",
            })
            .expect("decode pipeline should succeed");

        assert_eq!((prepared.width, prepared.height), (100, 75));
        assert_eq!(prepared.bytes.len(), 100 * 75 * 4);
    }

    #[test]
    fn decode_rejects_non_image_bytes() {
        let converter = converter_with(ConvertConfig::default());

        let result = converter.decode_and_resize(RawImageData {
            bytes: b"definitely not an image".to_vec(),
            source_hint: "test",
        });

        assert!(matches!(result, Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn decode_rejects_too_many_pixels_before_full_decode() {
        let converter = converter_with(ConvertConfig {
            max_decoded_pixels: 1_000_000,
            ..ConvertConfig::default()
        });
        let png = create_png_bytes(2000, 2000);

        let result = converter.decode_and_resize(RawImageData {
            bytes: png,
            source_hint: "test",
        });

        assert!(matches!(result, Err(ConvertError::ResourceLimit(_))));
    }

    proptest! {
        /// 任意尺寸与上限组合下：不放大、两个上限同时成立、结果至少 1 像素。
        #[test]
        fn target_dimensions_invariants(
            width in 1u32..6000,
            height in 1u32..6000,
            max_w in 1u32..4000,
            max_h in 1u32..4000,
        ) {
            let (w, h) = WebpConverter::target_dimensions(
                width,
                height,
                Some(max_w),
                Some(max_h),
            );

            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w <= width && h <= height);
            prop_assert!(w <= max_w);
            prop_assert!(h <= max_h);
        }
    }
}
