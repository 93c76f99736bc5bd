//! OCR.space 客户端
//!
//! 识别图表图片中的文字，供 38 题提示词使用

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::clients::{http_client, OcrService};
use crate::config::Config;
use crate::error::{ApiError, AppError};

#[derive(Debug, Deserialize)]
struct OcrSpaceResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored_on_processing: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

impl OcrSpaceResponse {
    fn into_text(self) -> Result<String, ApiError> {
        if self.is_errored_on_processing {
            let message = match &self.error_message {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
                serde_json::Value::Null => "Unknown error".to_string(),
                other => other.to_string(),
            };
            return Err(ApiError::OcrFailed { message });
        }

        self.parsed_results
            .into_iter()
            .next()
            .map(|r| r.parsed_text)
            .ok_or_else(|| ApiError::OcrFailed {
                message: "未识别到任何文字".to_string(),
            })
    }
}

/// OCR.space 客户端（Engine 2，英文）
pub struct OcrSpaceClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OcrSpaceClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: http_client(config.http_timeout()),
            api_url: config.ocr_api_url.clone(),
            api_key: config.ocr_api_key.clone(),
        }
    }
}

#[async_trait]
impl OcrService for OcrSpaceClient {
    async fn recognize(&self, image: &[u8], file_name: &str) -> Result<String> {
        debug!("发送 OCR 请求: {} ({} 字节)", file_name, image.len());

        let part = Part::bytes(image.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .context("无法构建 OCR 请求")?;
        let form = Form::new()
            .text("isOverlayRequired", "false")
            .text("language", "eng")
            .text("OCREngine", "2")
            .text("scale", "true")
            .part("file", part);

        let response = self
            .http
            .post(&self.api_url)
            .header("apikey", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.api_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::BadResponse {
                endpoint: self.api_url.clone(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: OcrSpaceResponse = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&self.api_url, e))?;
        let text = parsed.into_text()?;

        info!("✓ OCR 识别完成，{} 字符", text.chars().count());
        Ok(text)
    }
}
