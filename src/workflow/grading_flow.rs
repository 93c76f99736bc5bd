//! 评分流程 - 流程层
//!
//! 核心职责：定义"一份作答"的完整评分流程
//!
//! 流程顺序：
//! 1. 字数门槛（不足 → 0 分，不调用模型）
//! 2. 按细则逐条评分
//! 3. 汇总分数、组装评语
//! 4. 组装评分记录（由调用方确认会话仍有效后再上报）

use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clients::ResultSink;
use crate::models::{ResultRecord, TaskType};
use crate::services::feedback::GradeReport;
use crate::services::prompt_sequencer::PromptSequencer;
use crate::services::result_record::build_result_record;
use crate::services::status::{notify, StatusSink};
use crate::services::word_gate::{apply_word_policy, rejection_message, WordPolicyOutcome};
use crate::utils::logging::truncate_text;
use crate::workflow::check_ctx::CheckCtx;
use crate::workflow::session::GraphArtifacts;

/// 一次提交的全部输入
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub task: &'a TaskType,
    pub description: &'a str,
    /// 学生作答原文
    pub solution: &'a str,
    pub graph: Option<&'a GraphArtifacts>,
}

/// 评分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradingOutcome {
    /// 字数不足，记 0 分
    Rejected {
        message: String,
        word_count: usize,
        min_words: usize,
    },
    Graded {
        report: GradeReport,
        /// 37 / 38 题的后端记录，其他任务为 None
        record: Option<ResultRecord>,
    },
}

/// 评分流程
///
/// - 编排完整的评分流程
/// - 不持有会话状态
/// - 只依赖业务能力（services）与结果接收方
pub struct GradingFlow {
    sequencer: PromptSequencer,
    sink: Arc<dyn ResultSink>,
}

impl GradingFlow {
    pub fn new(sequencer: PromptSequencer, sink: Arc<dyn ResultSink>) -> Self {
        Self { sequencer, sink }
    }

    pub fn sequencer(&self) -> &PromptSequencer {
        &self.sequencer
    }

    pub async fn run(
        &self,
        ctx: &CheckCtx,
        submission: Submission<'_>,
        status: &dyn StatusSink,
    ) -> Result<GradingOutcome> {
        let rubric = self.sequencer.rubric_for(submission.task);
        info!(
            "{} 📝 开始检查，作答预览: {}",
            ctx,
            truncate_text(submission.solution, 60)
        );

        // ========== 1. 字数门槛 ==========
        let (text, notice) = match rubric.word_limits {
            Some(limits) => {
                notify(status, "📊 Подсчёт количества слов...").await;
                match apply_word_policy(submission.solution, limits.min_words, limits.max_words) {
                    WordPolicyOutcome::TooShort {
                        word_count,
                        min_words,
                    } => {
                        warn!(
                            "{} ⚠️ 字数不足: {} < {}，记 0 分",
                            ctx, word_count, min_words
                        );
                        return Ok(GradingOutcome::Rejected {
                            message: rejection_message(word_count, min_words),
                            word_count,
                            min_words,
                        });
                    }
                    WordPolicyOutcome::Accepted(gated) => {
                        if gated.notice.is_some() {
                            info!(
                                "{} ✂️ 作答已截断: {} → {} 词",
                                ctx, gated.original_word_count, gated.word_count
                            );
                        }
                        (gated.text, gated.notice)
                    }
                }
            }
            None => (submission.solution.to_string(), None),
        };

        // ========== 2. 逐条评分 ==========
        let ocr_text = submission.graph.map(|g| g.ocr_text.as_str());
        let result = self
            .sequencer
            .run_rubric(
                submission.task,
                submission.description,
                &text,
                ocr_text,
                status,
            )
            .await?;

        // ========== 3. 汇总 ==========
        let report = GradeReport::compose(rubric, result, notice.as_deref());
        notify(status, "✅ Проверка завершена! Подготавливаю результаты...").await;
        info!(
            "{} ✓ 检查完成: 分数 {:?}，总分 {}{}",
            ctx,
            report.scores,
            report.final_score,
            if report.vetoed { "（第一项为 0，整体记 0）" } else { "" }
        );

        // ========== 4. 组装记录 ==========
        let table_image = submission.graph.and_then(|g| g.image_data_url.as_deref());
        let record = build_result_record(
            submission.task,
            rubric,
            submission.description,
            submission.solution,
            &report,
            table_image,
        );

        Ok(GradingOutcome::Graded { report, record })
    }

    /// 在后台上报评分记录，失败只记录日志
    ///
    /// # 返回
    /// 上报任务的句柄；调用方可以不等待
    pub fn deliver(&self, ctx: &CheckCtx, record: ResultRecord) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let prefix = ctx.to_string();
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&record).await {
                error!("{} ❌ 评分记录上报失败（不影响结果）: {:#}", prefix, e);
            }
        })
    }
}
