//! 后端 API 客户端
//!
//! 负责用户注册、免费次数查询与扣减、评分记录上报

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::clients::{http_client, QuotaService, ResultSink};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{QuotaDecision, ResultRecord, UserRef};

/// 后端中的用户账户
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct TgUser {
    #[serde(rename = "FreeChecksLeft", default)]
    free_checks_left: i64,
    #[serde(rename = "IsActive", default)]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    access_token: String,
}

/// 后端 API 客户端
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: http_client(config.http_timeout()),
            base_url: config.backend_api_base_url.trim_end_matches('/').to_string(),
            username: config.backend_username.clone(),
            password: config.backend_password.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 查询用户；不存在时返回 None
    async fn fetch_user(&self, user_id: i64) -> AppResult<Option<TgUser>> {
        let endpoint = self.url(&format!("/tgusers/{}", user_id));
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        match response.status() {
            StatusCode::OK => {
                let user = response
                    .json::<TgUser>()
                    .await
                    .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
                debug!("[用户 {}] 账户信息: {:?}", user_id, user);
                Ok(Some(user))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ApiError::BadResponse {
                endpoint,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }
            .into()),
        }
    }

    /// 获取上报用的访问令牌
    async fn auth_token(&self) -> AppResult<String> {
        let endpoint = self.url("/auth/login");
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::AuthFailed {
                reason: format!(
                    "status={}, body={}",
                    status.as_u16(),
                    response.text().await.unwrap_or_default()
                ),
            }
            .into());
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;
        if auth.access_token.is_empty() {
            return Err(ApiError::AuthFailed {
                reason: "响应中缺少 access_token".to_string(),
            }
            .into());
        }
        Ok(auth.access_token)
    }

    async fn create_user(&self, user: &UserRef) -> AppResult<bool> {
        let endpoint = self.url("/tgusers");
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({
                "tg_id": user.id,
                "username": user.username.as_deref().unwrap_or("unknown"),
            }))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::BAD_REQUEST && body.to_lowercase().contains("already exists") {
            debug!("[用户 {}] 已存在 (400)", user.id);
            return Ok(true);
        }
        Err(ApiError::BadResponse {
            endpoint,
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

#[async_trait]
impl QuotaService for BackendClient {
    async fn register_user(&self, user: &UserRef) -> bool {
        match self.fetch_user(user.id).await {
            Ok(Some(_)) => {
                debug!("[用户 {}] 已注册", user.id);
                true
            }
            Ok(None) => match self.create_user(user).await {
                Ok(created) => {
                    info!("[用户 {}] ✓ 注册成功", user.id);
                    created
                }
                Err(e) => {
                    error!("[用户 {}] ❌ 注册失败: {}", user.id, e);
                    false
                }
            },
            Err(e) => {
                error!("[用户 {}] ❌ 查询用户失败: {}", user.id, e);
                false
            }
        }
    }

    async fn can_proceed(&self, user_id: i64) -> QuotaDecision {
        match self.fetch_user(user_id).await {
            Ok(Some(user)) => QuotaDecision::from_account(user.is_active, user.free_checks_left),
            Ok(None) => {
                warn!("[用户 {}] ⚠️ 后端中不存在该用户", user_id);
                QuotaDecision::deny("Не удалось получить данные пользователя", 0)
            }
            Err(e) => {
                error!("[用户 {}] ❌ 额度检查失败: {}", user_id, e);
                QuotaDecision::deny(format!("Произошла ошибка: {}", e), 0)
            }
        }
    }

    async fn decrement_free_checks(&self, user_id: i64) -> bool {
        let current = match self.fetch_user(user_id).await {
            Ok(Some(user)) => user.free_checks_left,
            Ok(None) => {
                warn!("[用户 {}] ⚠️ 无法扣减：用户不存在", user_id);
                return false;
            }
            Err(e) => {
                error!("[用户 {}] ❌ 无法扣减：{}", user_id, e);
                return false;
            }
        };

        if current <= 0 {
            debug!("[用户 {}] 免费次数已为 {}，不扣减", user_id, current);
            return true;
        }

        let endpoint = self.url(&format!("/tgusers/{}/free_checks", user_id));
        match self
            .http
            .patch(&endpoint)
            .json(&json!({ "FreeChecksLeft": -1 }))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!("[用户 {}] ✓ 免费次数 {} → {}", user_id, current, current - 1);
                true
            }
            Ok(resp) => {
                error!("[用户 {}] ❌ 扣减失败: status={}", user_id, resp.status());
                false
            }
            Err(e) => {
                error!("[用户 {}] ❌ 扣减请求失败: {}", user_id, e);
                false
            }
        }
    }
}

#[async_trait]
impl ResultSink for BackendClient {
    async fn deliver(&self, record: &ResultRecord) -> Result<()> {
        let token = self.auth_token().await?;
        let endpoint = self.url(record.endpoint());

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .json(record)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadResponse {
                endpoint,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }
            .into());
        }

        info!("📤 评分记录已上报: {}", record.endpoint());
        Ok(())
    }
}
