//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（URL / 本地文件）的原始字节加载，并在“尽可能早”的阶段执行输入校验。
//! 目标是尽快失败，减少不必要内存与 CPU 消耗。
//!
//! ## 实现思路
//!
//! - URL：地址解析 + 状态码 + 内容类型 + 体积校验 + 流式下载（逐块带超时）。
//! - 文件：存在性 + metadata 体积限制 + 文件头内容类型探测 + 读取。
//! - 非图片的本地输入在读取完整内容之前即以 `InvalidInput` 拒绝。
//! - 网络错误统一映射到 `ConvertError`，便于上层处理。

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use super::source::RawImageData;
use super::{ConvertError, WebpConverter};

const SIGNATURE_PROBE_BYTES: usize = 4096;
const BUFFER_INITIAL_CAPACITY: usize = 16 * 1024;

impl WebpConverter {
    /// 从 URL 加载图片原始字节。
    pub(crate) async fn load_from_url(&self, url: &str) -> Result<RawImageData, ConvertError> {
        log::info!("🌐 开始下载图片 - URL: {}", Self::redact_url_for_log(url));

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ConvertError::InvalidFormat(format!("URL 格式错误：{}", e)))?;

        let bytes = self.download_with_validation(parsed).await?;
        Self::validate_image_signature(&bytes)?;

        Ok(RawImageData {
            bytes,
            source_hint: "url",
        })
    }

    /// 从本地路径加载图片原始字节。
    pub(crate) fn load_from_file(&self, path: &Path) -> Result<RawImageData, ConvertError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(ConvertError::FileSystem(format!(
                "文件不存在：{}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConvertError::FileSystem(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > self.config.max_file_size {
            return Err(ConvertError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        // 内容类型前置检查：仅读取文件头，未通过时不读取文件主体
        Self::probe_file_is_image(path)?;

        let bytes = std::fs::read(path)
            .map_err(|e| ConvertError::FileSystem(format!("无法读取图片文件：{}", e)))?;

        Ok(RawImageData {
            bytes,
            source_hint: "file",
        })
    }

    /// 执行带校验的网络下载。
    ///
    /// 使用流式读取，避免一次性读入导致内存峰值过高；每个分块受独立超时约束，
    /// 服务端停止发送数据时调用会在有界时间内失败而不是悬挂。
    async fn download_with_validation(
        &self,
        url: reqwest::Url,
    ) -> Result<Vec<u8>, ConvertError> {
        let config = &self.config;

        log::debug!("📡 发送 HTTP 请求...");
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::Network(format!("HTTP 状态异常：{}", status)));
        }

        if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
            let value = content_type.to_str().unwrap_or("");
            if !Self::is_image_content_type(value) {
                return Err(ConvertError::InvalidFormat(format!(
                    "响应内容类型不是图片：{}",
                    value
                )));
            }
        }

        if let Some(total) = response.content_length() {
            if total > config.max_file_size {
                return Err(ConvertError::ResourceLimit(format!(
                    "下载体积过大：{:.2} MB（限制：{:.2} MB）",
                    total as f64 / 1024.0 / 1024.0,
                    config.max_file_size as f64 / 1024.0 / 1024.0
                )));
            }
        }

        let chunk_timeout = Duration::from_millis(config.stream_chunk_timeout_ms);
        let mut buffer: Vec<u8> = Vec::with_capacity(BUFFER_INITIAL_CAPACITY);

        loop {
            let next_chunk = tokio::time::timeout(chunk_timeout, response.chunk())
                .await
                .map_err(|_| {
                    ConvertError::Timeout(format!(
                        "下载分块读取超时（{}毫秒）",
                        config.stream_chunk_timeout_ms
                    ))
                })?
                .map_err(|e| self.map_reqwest_error(e))?;

            match next_chunk {
                Some(data) => {
                    if (buffer.len() + data.len()) as u64 > config.max_file_size {
                        return Err(ConvertError::ResourceLimit(format!(
                            "下载体积过大：超过 {:.2} MB 限制",
                            config.max_file_size as f64 / 1024.0 / 1024.0
                        )));
                    }
                    buffer.extend_from_slice(&data);
                }
                None => break,
            }
        }

        if buffer.is_empty() {
            return Err(ConvertError::Network("响应体为空".to_string()));
        }

        log::debug!("📥 下载完成 - {}KB", buffer.len() / 1024);
        Ok(buffer)
    }

    /// 仅读取文件头并探测内容类型。
    ///
    /// 非图片输入返回 [`ConvertError::InvalidInput`]，此时文件主体尚未被读取。
    fn probe_file_is_image(path: &Path) -> Result<(), ConvertError> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| ConvertError::FileSystem(format!("无法打开图片文件：{}", e)))?;

        let mut probe = [0u8; SIGNATURE_PROBE_BYTES];
        let read = file
            .read(&mut probe)
            .map_err(|e| ConvertError::FileSystem(format!("无法读取文件头：{}", e)))?;

        match infer::get(&probe[..read]) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(()),
            _ => Err(ConvertError::InvalidInput),
        }
    }

    /// 校验已加载字节的图片签名。
    ///
    /// 用于 URL 下载结果：内容类型头可被伪造，落地字节必须自证是图片。
    fn validate_image_signature(bytes: &[u8]) -> Result<(), ConvertError> {
        match infer::get(bytes) {
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(()),
            Some(kind) => Err(ConvertError::InvalidFormat(format!(
                "响应内容不是图片：{}",
                kind.mime_type()
            ))),
            None => Err(ConvertError::InvalidFormat(
                "无法识别的内容签名".to_string(),
            )),
        }
    }

    pub(crate) fn is_image_content_type(value: &str) -> bool {
        value
            .split(';')
            .next()
            .map(|main| main.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false)
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> ConvertError {
        if error.is_timeout() {
            ConvertError::Timeout(format!("下载超时（{}秒）", self.config.download_timeout))
        } else if error.is_connect() {
            ConvertError::Network(format!("连接失败：{}", error))
        } else {
            ConvertError::Network(format!("网络请求失败：{}", error))
        }
    }

    pub(crate) fn redact_url_for_log(url: &str) -> String {
        match reqwest::Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => url.to_string(),
        }
    }
}
