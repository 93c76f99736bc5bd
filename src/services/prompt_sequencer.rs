//! 提示词序列 - 业务能力层
//!
//! 对一个任务按细则逐条评分：渲染模板 → 调用评估器 → 提取分数。
//! 严格顺序执行，任一条失败即中止，不返回部分结果。

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{EvaluationResult, Rubric, RubricSet, TaskType};
use crate::services::evaluator::Evaluator;
use crate::services::status::{notify, StatusSink};
use crate::services::templates::{render_prompt, PromptInput, TemplateSource};

/// 提示词序列执行器
pub struct PromptSequencer {
    evaluator: Arc<dyn Evaluator>,
    templates: Arc<dyn TemplateSource>,
    rubrics: Arc<RubricSet>,
}

impl PromptSequencer {
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        templates: Arc<dyn TemplateSource>,
        rubrics: Arc<RubricSet>,
    ) -> Self {
        Self {
            evaluator,
            templates,
            rubrics,
        }
    }

    /// 任务对应的细则
    pub fn rubric_for(&self, task: &TaskType) -> &Rubric {
        self.rubrics.rubric_for(task)
    }

    /// 按细则逐条评分
    ///
    /// # 参数
    /// - `task`: 任务类型
    /// - `description`: 任务描述
    /// - `solution`: 学生作答（已经过字数门槛）
    /// - `ocr_text`: 图表 OCR 文本
    /// - `status`: 进度通知
    ///
    /// # 返回
    /// 每条标准的分数与原始回答，长度与细则一致
    pub async fn run_rubric(
        &self,
        task: &TaskType,
        description: &str,
        solution: &str,
        ocr_text: Option<&str>,
        status: &dyn StatusSink,
    ) -> Result<EvaluationResult> {
        let rubric = self.rubric_for(task);
        let total = rubric.len();
        let input = PromptInput {
            task_number: task.code(),
            description,
            solution,
            ocr_text: if rubric.requires_image { ocr_text } else { None },
        };

        info!("📋 使用细则「{}」，共 {} 条评分标准", rubric.title, total);

        let mut result = EvaluationResult::with_capacity(total);
        for criterion in &rubric.criteria {
            let i = criterion.index;
            notify(
                status,
                &format!(
                    "🔍 Анализирую твою работу... Шаг {}/{} ({}%)",
                    i + 1,
                    total,
                    i * 100 / total
                ),
            )
            .await;

            let template = self.templates.load(&criterion.template).await?;
            let prompt = render_prompt(&template, &input);
            debug!("标准 {} 提示词长度: {} 字符", criterion.key, prompt.chars().count());

            let response = self
                .evaluator
                .generate(&prompt)
                .await
                .with_context(|| format!("评分标准 {} 评估失败", criterion.key))?;

            notify(
                status,
                &format!("📊 Анализирую ответ... ({}%)", (i + 1) * 100 / total),
            )
            .await;

            let score = rubric.extract_score(&response, i);
            info!(
                "✓ 标准 {}/{} ({}) 得分: {}/{}",
                i + 1,
                total,
                criterion.label,
                score,
                criterion.max_score
            );
            result.push(score, response);
        }

        Ok(result)
    }
}
