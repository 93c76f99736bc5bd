use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 评分细则错误
    #[error("评分细则错误: {0}")]
    Rubric(#[from] RubricError),
    /// 外部 API 错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 重试次数耗尽
    #[error("评估服务不可用: 已尝试 {attempts} 次, 最后一次错误: {last_error}")]
    EvaluationUnavailable { attempts: usize, last_error: String },
}

/// 评分细则错误
#[derive(Debug, Error)]
pub enum RubricError {
    /// 提示词模板缺失
    #[error("提示词模板不存在: {path}")]
    TemplateMissing {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 细则文件读取失败
    #[error("无法读取评分细则文件 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("评分细则解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 评分正则无效
    #[error("评分标准 {criterion} 的正则无效 '{pattern}': {source}")]
    InvalidPattern {
        criterion: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// 细则没有任何评分标准
    #[error("任务 {task} 的评分细则没有评分标准")]
    EmptyRubric { task: String },
    /// 缺少通用细则
    #[error("评分细则文件缺少通用细则 (task = \"generic\")")]
    MissingGeneric,
}

/// 外部 API 错误（后端 / OCR）
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 获取授权令牌失败
    #[error("获取授权令牌失败: {reason}")]
    AuthFailed { reason: String },
    /// OCR 识别失败
    #[error("OCR识别失败: {message}")]
    OcrFailed { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 配置值不合法
    #[error("环境变量 {var_name} 的值 '{value}' 不合法: {reason}")]
    InvalidValue {
        var_name: String,
        value: String,
        reason: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建API请求失败错误
    pub fn api_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
