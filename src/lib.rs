//! # image-to-webp
//!
//! ## 设计思路
//!
//! 该库把“图片来源识别 → 加载校验 → 解码缩放 → WebP 编码”按职责拆分为多个子模块，
//! 避免单文件膨胀与耦合。
//!
//! - `converter`：对外入口，编排整条转换流水线
//! - `loader`：负责 URL/文件加载与早期校验
//! - `pipeline`：负责解码、像素限制、按尺寸上限降采样
//! - `encoder`：负责有损 WebP 序列化
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 实现思路
//!
//! 对外仅暴露必要类型，内部细节保持 `mod` 私有。
//! 转换器构造后不可变，任意数量的并发转换可以安全共享同一实例。
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! convert_file_to_webp / convert_url_to_webp
//!    ↓
//! converter.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 内容类型/体积校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + 降采样）
//!    └─ encoder.rs（有损 WebP 编码）
//!    ↓
//! 返回 WebpBlob 或 ConvertError
//! ```
//!
//! ## 分层职责建议
//!
//! - 质量/尺寸上限等策略变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `converter.rs`
//! - 单阶段行为优化分别改 `loader/pipeline/encoder`

mod config;
mod converter;
mod encoder;
mod error;
mod loader;
mod pipeline;
mod source;

pub use config::ConvertConfig;
pub use converter::WebpConverter;
pub use error::ConvertError;
pub use source::{ImageSource, WebpBlob};
