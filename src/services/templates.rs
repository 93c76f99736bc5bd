//! 提示词模板 - 业务能力层
//!
//! 模板按文件名读取，占位符：
//! `{{task_description}}`、`{{solution}}`、`{{graph_ocr}}`、`{{task_number}}`

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;

use crate::error::RubricError;

/// 模板来源
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn load(&self, name: &str) -> Result<String, RubricError>;
}

/// 从目录读取模板文件
#[derive(Debug, Clone)]
pub struct PromptDirectory {
    dir: PathBuf,
}

impl PromptDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateSource for PromptDirectory {
    async fn load(&self, name: &str) -> Result<String, RubricError> {
        let path = self.dir.join(name);
        fs::read_to_string(&path)
            .await
            .map_err(|source| RubricError::TemplateMissing {
                path: path.display().to_string(),
                source,
            })
    }
}

/// 内存模板（测试与嵌入场景）
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplates {
    templates: HashMap<String, String>,
}

impl InMemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.templates.insert(name.into(), body.into());
        self
    }
}

#[async_trait]
impl TemplateSource for InMemoryTemplates {
    async fn load(&self, name: &str) -> Result<String, RubricError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| RubricError::TemplateMissing {
                path: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "template not registered"),
            })
    }
}

/// 渲染模板所需的输入
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub task_number: &'a str,
    pub description: &'a str,
    pub solution: &'a str,
    /// 图表 OCR 文本（仅对需要图片的任务生效）
    pub ocr_text: Option<&'a str>,
}

/// 替换模板中的占位符
pub fn render_prompt(template: &str, input: &PromptInput<'_>) -> String {
    let graph_block = match input.ocr_text.map(str::trim) {
        Some(ocr) if !ocr.is_empty() => format!("\n\nРаспознанный текст с графика:\n{}", ocr),
        _ => String::new(),
    };

    template
        .replace("{{task_description}}", input.description)
        .replace("{{solution}}", input.solution)
        .replace("{{graph_ocr}}", &graph_block)
        .replace("{{task_number}}", input.task_number)
}
