//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `WebpConverter` 只负责流程编排与配置持有，不关心单阶段实现细节。
//! 处理链路固定为：
//! 1. 按来源加载原始字节
//! 2. 解码并按尺寸上限降采样
//! 3. 有损 WebP 编码
//!
//! ## 实现思路
//!
//! - 配置在构造时校验一次，之后不可变；任意数量的并发转换可共享同一实例，
//!   单次调用内各阶段严格顺序执行，调用之间互不影响。
//! - HTTP 客户端在构造时创建并复用，超时参数来自配置，保证加载失败在有界时间内返回。
//! - 记录 `load/decode/encode/total` 阶段耗时，便于性能诊断。

use std::path::Path;
use std::time::{Duration, Instant};

use super::source::RawImageData;
use super::{ConvertConfig, ConvertError, ImageSource, WebpBlob};

/// 图片转 WebP 转换器。
///
/// 封装了不可变配置与复用型 HTTP 客户端，并编排各子模块实现完整流程。
pub struct WebpConverter {
    pub(crate) config: ConvertConfig,
    pub(crate) client: reqwest::Client,
}

impl WebpConverter {
    /// 根据配置创建转换器。
    ///
    /// 这里同时构建复用型 HTTP 客户端，减少每次请求的初始化开销。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use image_to_webp::{ConvertConfig, WebpConverter};
    ///
    /// let converter = WebpConverter::new(ConvertConfig {
    ///     quality: 0.75,
    ///     max_width: Some(1280),
    ///     ..ConvertConfig::default()
    /// })?;
    /// # Ok::<(), image_to_webp::ConvertError>(())
    /// ```
    pub fn new(config: ConvertConfig) -> Result<Self, ConvertError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .build()
            .map_err(|e| ConvertError::Network(format!("HTTP 客户端初始化失败：{}", e)))?;

        Ok(Self { config, client })
    }

    /// 使用默认配置创建转换器。
    pub fn with_defaults() -> Result<Self, ConvertError> {
        Self::new(ConvertConfig::default())
    }

    /// 当前生效配置（只读）。
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// 将本地图片文件转换为 WebP。
    ///
    /// 文件头探测为非图片时，在读取完整内容与任何解码动作之前即返回
    /// [`ConvertError::InvalidInput`]。
    pub async fn convert_file_to_webp(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<WebpBlob, ConvertError> {
        self.convert_source(ImageSource::FilePath(path.as_ref().to_path_buf()))
            .await
    }

    /// 将图片 URL 转换为 WebP。
    ///
    /// 下载阶段受配置的连接/总超时与分块读取超时约束，加载失败在有界时间内返回错误。
    pub async fn convert_url_to_webp(&self, url: &str) -> Result<WebpBlob, ConvertError> {
        self.convert_source(ImageSource::Url(url.to_string())).await
    }

    /// 转换主入口：从任意来源加载并编码为 WebP。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use image_to_webp::{ImageSource, WebpConverter};
    ///
    /// # async fn demo() -> Result<(), image_to_webp::ConvertError> {
    /// let converter = WebpConverter::with_defaults()?;
    /// let blob = converter
    ///     .convert_source(ImageSource::FilePath("/tmp/test.png".into()))
    ///     .await?;
    /// assert_eq!(blob.content_type(), "image/webp");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn convert_source(&self, source: ImageSource) -> Result<WebpBlob, ConvertError> {
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw: RawImageData = match source {
            ImageSource::Url(url) => self.load_from_url(&url).await?,
            ImageSource::FilePath(path) => self.load_from_file(&path)?,
        };
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let prepared = self.decode_and_resize(raw)?;
        let decode_elapsed = decode_start.elapsed();

        let encode_start = Instant::now();
        let blob = self.encode_webp(prepared)?;
        let encode_elapsed = encode_start.elapsed();

        let total_elapsed = total_start.elapsed();
        log::info!(
            "✅ 图片转换完成 - load={}ms decode={}ms encode={}ms total={}ms 输出={}x{}（{}KB）",
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_elapsed.as_millis(),
            blob.width(),
            blob.height(),
            blob.len() / 1024
        );

        Ok(blob)
    }
}
