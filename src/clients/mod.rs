//! 外部服务客户端
//!
//! 对话引擎只依赖这里的 trait；真实实现走 HTTP，离线实现放在内存里

pub mod backend_client;
pub mod llm_client;
pub mod memory_quota;
pub mod ocr_client;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::{QuotaDecision, ResultRecord, UserRef};

pub use backend_client::BackendClient;
pub use llm_client::LlmClient;
pub use memory_quota::InMemoryQuota;
pub use ocr_client::OcrSpaceClient;

/// 带超时的 HTTP 客户端；构建失败时退回默认客户端
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("⚠️ HTTP 客户端构建失败，使用默认配置: {}", e);
            reqwest::Client::new()
        })
}

/// 额度 / 订阅服务
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// 注册用户（已存在时视为成功）
    async fn register_user(&self, user: &UserRef) -> bool;

    /// 用户是否可以开始一次检查
    async fn can_proceed(&self, user_id: i64) -> QuotaDecision;

    /// 扣减一次免费检查；已为 0 时不扣减
    async fn decrement_free_checks(&self, user_id: i64) -> bool;
}

/// 图片文字识别
#[async_trait]
pub trait OcrService: Send + Sync {
    async fn recognize(&self, image: &[u8], file_name: &str) -> anyhow::Result<String>;
}

/// 评分记录接收方
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn deliver(&self, record: &ResultRecord) -> anyhow::Result<()>;
}

/// 未配置 OCR 时使用：总是失败，由调用方降级为空文本
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

#[async_trait]
impl OcrService for DisabledOcr {
    async fn recognize(&self, _image: &[u8], _file_name: &str) -> anyhow::Result<String> {
        anyhow::bail!("OCR 未配置 (OCR_API_KEY 为空)")
    }
}

/// 未配置后端时使用：只记录日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResultSink;

#[async_trait]
impl ResultSink for LoggingResultSink {
    async fn deliver(&self, record: &ResultRecord) -> anyhow::Result<()> {
        info!(
            "📭 离线模式，评分记录未上报 ({}，原文 {} 字符)",
            record.endpoint(),
            record.essay().chars().count()
        );
        Ok(())
    }
}
