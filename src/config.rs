use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 生成参数（固定配置，不随请求变化）
    pub llm_temperature: f32,
    pub llm_top_p: f32,
    pub llm_max_output_tokens: u32,
    /// 单次生成的最大尝试次数
    pub llm_max_attempts: usize,
    /// 线性退避的基础间隔（秒）
    pub llm_retry_delay_secs: u64,
    /// 后端与 OCR 请求的超时（秒）
    pub http_timeout_secs: u64,
    // --- OCR 配置 ---
    pub ocr_api_key: String,
    pub ocr_api_url: String,
    // --- 后端 API 配置 ---
    /// 为空时使用内存额度与丢弃型结果上报（离线模式）
    pub backend_api_base_url: String,
    pub backend_username: String,
    pub backend_password: String,
    // --- 评分细则 ---
    /// 提示词模板目录
    pub prompts_dir: String,
    /// 评分细则 TOML 文件；为空时使用内置细则
    pub rubric_file: String,
    /// 详细分析分页的单条消息上限（字符）
    pub message_chunk_limit: usize,
    /// 反馈命令中给出的开发者联系方式
    pub developer_contact: String,
    // --- 控制台模式 ---
    pub console_user_id: i64,
    /// 离线额度存储中新用户的免费检查次数
    pub initial_free_checks: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            llm_temperature: 0.4,
            llm_top_p: 0.95,
            llm_max_output_tokens: 8192,
            llm_max_attempts: 3,
            llm_retry_delay_secs: 5,
            http_timeout_secs: 30,
            ocr_api_key: String::new(),
            ocr_api_url: "https://api.ocr.space/parse/image".to_string(),
            backend_api_base_url: String::new(),
            backend_username: String::new(),
            backend_password: String::new(),
            prompts_dir: "prompts".to_string(),
            rubric_file: String::new(),
            message_chunk_limit: 3800,
            developer_contact: String::new(),
            console_user_id: 1,
            initial_free_checks: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE").unwrap_or(default.llm_temperature),
            llm_top_p: env_parse("LLM_TOP_P").unwrap_or(default.llm_top_p),
            llm_max_output_tokens: env_parse("LLM_MAX_OUTPUT_TOKENS").unwrap_or(default.llm_max_output_tokens),
            llm_max_attempts: env_parse("LLM_MAX_ATTEMPTS").unwrap_or(default.llm_max_attempts),
            llm_retry_delay_secs: env_parse("LLM_RETRY_DELAY_SECS").unwrap_or(default.llm_retry_delay_secs),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS").unwrap_or(default.http_timeout_secs),
            ocr_api_key: std::env::var("OCR_API_KEY").unwrap_or(default.ocr_api_key),
            ocr_api_url: std::env::var("OCR_API_URL").unwrap_or(default.ocr_api_url),
            backend_api_base_url: std::env::var("API_BASE_URL").unwrap_or(default.backend_api_base_url),
            backend_username: std::env::var("API_USERNAME").unwrap_or(default.backend_username),
            backend_password: std::env::var("API_PASSWORD").unwrap_or(default.backend_password),
            prompts_dir: std::env::var("PROMPTS_DIR").unwrap_or(default.prompts_dir),
            rubric_file: std::env::var("RUBRIC_FILE").unwrap_or(default.rubric_file),
            message_chunk_limit: env_parse("MESSAGE_CHUNK_LIMIT").unwrap_or(default.message_chunk_limit),
            developer_contact: std::env::var("DEVELOPER_CONTACT").unwrap_or(default.developer_contact),
            console_user_id: env_parse("CONSOLE_USER_ID").unwrap_or(default.console_user_id),
            initial_free_checks: env_parse("INITIAL_FREE_CHECKS").unwrap_or(default.initial_free_checks),
        }
    }

    /// 校验启动所必需的配置项
    ///
    /// OCR 与后端配置缺失时只会降级，不视为错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string(),
            });
        }
        if self.llm_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                var_name: "LLM_MAX_ATTEMPTS".to_string(),
                value: self.llm_max_attempts.to_string(),
                reason: "至少需要 1 次尝试".to_string(),
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var_name: "HTTP_TIMEOUT_SECS".to_string(),
                value: self.http_timeout_secs.to_string(),
                reason: "超时必须大于 0".to_string(),
            });
        }
        if self.message_chunk_limit < 100 {
            return Err(ConfigError::InvalidValue {
                var_name: "MESSAGE_CHUNK_LIMIT".to_string(),
                value: self.message_chunk_limit.to_string(),
                reason: "分页上限过小".to_string(),
            });
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// 是否连接真实后端
    pub fn backend_enabled(&self) -> bool {
        !self.backend_api_base_url.trim().is_empty()
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
