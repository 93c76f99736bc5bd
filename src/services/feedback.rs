//! 评语组装 - 业务能力层
//!
//! 把各标准的分数与模型回答拼成用户可读的评语

use crate::models::{EvaluationResult, Rubric};
use crate::services::aggregation::{aggregate, is_vetoed};

/// 一次完整评分的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub final_score: u32,
    pub scores: Vec<u32>,
    pub responses: Vec<String>,
    /// 完整评语（详细分析）
    pub feedback: String,
    /// 评分完成后立即发送的简要消息
    pub summary: String,
    pub vetoed: bool,
}

impl GradeReport {
    /// 根据评分结果生成报告
    ///
    /// # 参数
    /// - `rubric`: 使用的细则
    /// - `result`: 逐条评分结果
    /// - `notice`: 截断提示（可选），置于评语最前
    pub fn compose(rubric: &Rubric, result: EvaluationResult, notice: Option<&str>) -> Self {
        let final_score = aggregate(&result.scores);
        let vetoed = is_vetoed(&result.scores);
        let notice = notice.unwrap_or_default();

        let (feedback, summary) = if rubric.breakdown {
            let table = score_lines(rubric, &result.scores);

            let mut feedback = String::from(notice);
            if vetoed {
                feedback.push_str(&format!(
                    "Так как оценка по первому критерию ({}) равна 0, за всю работу выставляется 0 баллов.\n\n",
                    rubric.criteria.first().map(|c| c.label.as_str()).unwrap_or_default()
                ));
            }
            feedback.push_str(&format!(
                "Баллы по критериям:\n{}\n\nОбщий балл: {}\n\n---\n\n",
                table, final_score
            ));
            let sections = rubric
                .criteria
                .iter()
                .zip(&result.responses)
                .map(|(c, response)| format!("{}\n\n{}", c.heading, response))
                .collect::<Vec<_>>()
                .join("\n\n");
            feedback.push_str(&sections);

            let summary = format!(
                "Проверка завершена! Твоя оценка: {} баллов.\n\nБаллы по критериям:\n{}",
                final_score, table
            );
            (feedback, summary)
        } else {
            let response = result.responses.first().cloned().unwrap_or_default();
            let feedback = format!("{}{}", notice, response);
            let summary = format!("Проверка завершена! Твоя оценка: {} баллов.", final_score);
            (feedback, summary)
        };

        Self {
            final_score,
            scores: result.scores,
            responses: result.responses,
            feedback,
            summary,
            vetoed,
        }
    }
}

fn score_lines(rubric: &Rubric, scores: &[u32]) -> String {
    rubric
        .criteria
        .iter()
        .zip(scores)
        .map(|(c, s)| format!("{}. {}: {}", c.index + 1, c.label, s))
        .collect::<Vec<_>>()
        .join("\n")
}
