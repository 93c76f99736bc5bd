//! 进度通知端口
//!
//! 进度消息只是尽力送达：发送失败会被记录并忽略

use async_trait::async_trait;
use tracing::warn;

/// 进度通知接收方（例如聊天中一条不断被编辑的状态消息）
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, text: &str) -> anyhow::Result<()>;
}

/// 发送进度消息，失败时只记录日志
pub async fn notify(sink: &dyn StatusSink, text: &str) {
    if let Err(e) = sink.update(text).await {
        warn!("⚠️ 进度消息发送失败（忽略）: {}", e);
    }
}

/// 丢弃所有进度消息
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatus;

#[async_trait]
impl StatusSink for NoopStatus {
    async fn update(&self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
