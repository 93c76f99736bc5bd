//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 启动配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 CheckMate 启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🤖 模型: {}", config.llm_model_name);
    info!(
        "🔁 重试: 最多 {} 次，基础间隔 {} 秒",
        config.llm_max_attempts, config.llm_retry_delay_secs
    );
    info!(
        "📋 评分细则: {}",
        if config.rubric_file.is_empty() {
            "内置"
        } else {
            config.rubric_file.as_str()
        }
    );
    info!("📁 提示词目录: {}", config.prompts_dir);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
