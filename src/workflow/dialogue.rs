//! 对话状态机 - 流程层
//!
//! 引导用户完成：选择任务 → 任务描述 → [图表图片] → 作答 → 评分 → 详细分析。
//! 每条命令读取当前状态，写回下一个状态，并返回要发送给用户的消息。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{OcrService, QuotaService};
use crate::config::Config;
use crate::models::{TaskType, UserRef};
use crate::services::image_encoding::encode_data_url;
use crate::services::pagination::{paginate, DEFAULT_CHUNK_LIMIT};
use crate::services::status::{notify, StatusSink};
use crate::workflow::check_ctx::CheckCtx;
use crate::workflow::grading_flow::{GradingFlow, GradingOutcome, Submission};
use crate::workflow::session::{DialogState, GraphArtifacts, SessionStore};

const WELCOME: &str = "👋 Привет! Я бот CheckMate, который поможет проверить твое решение заданий ЕГЭ по английскому.\n\nВыбери задание:";
const CHOOSE_TASK: &str = "Выбери задание";
const ASK_DESCRIPTION: &str = "📄Пришли формулировку задания";
const ASK_GRAPH: &str = "📊 Пришли, пожалуйста, изображение графика";
const ASK_GRAPH_AGAIN: &str = "Пожалуйста, отправь изображение графика. Если у тебя нет изображения, отправь любую картинку, и я продолжу.";
const ASK_SOLUTION: &str = "📝Теперь пришли свою работу (решение задания)";
const GRAPH_DONE: &str = "✅ Изображение графика обработано";
const CHECK_STARTED: &str = "✨Теперь немного подожди, скоро случится магия...";
const CHECK_IN_PROGRESS: &str = "⏳ Проверка уже идёт, подожди немного...";
const CHECK_FAILED: &str = "❌ Произошла ошибка при проверке. Попробуй ещё раз позже: /new";
const DETAILS_HEADER: &str = "Подробный анализ твоей работы:\n\n";
const DETAILS_HINT: &str = "Нажми «📝 Подробный анализ», чтобы увидеть разбор работы, или /new для новой проверки.";
const NO_SESSION: &str = "Чтобы начать проверку, используй /new";
const CANCELLED: &str = "Проверка отменена";
const FEEDBACK: &str = "Вы можете отправить отзыв или сообщить о проблеме разработчику";
const RATED_LIKE: &str = "Спасибо за положительную оценку! Пожалуйста, напишите, что именно вам понравилось в анализе.";
const RATED_DISLIKE: &str = "Спасибо за отзыв! Пожалуйста, напишите, что можно улучшить в анализе.";

/// 用户对详细分析的评价
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Like,
    Dislike,
}

/// 传输层发来的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    NewTask,
    SelectTask(String),
    SubmitText(String),
    SubmitImage { bytes: Vec<u8>, file_name: String },
    RequestDetails,
    Cancel,
    Feedback,
    Rate(Rating),
}

/// 消息附带的按钮
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    ChooseTask(TaskType),
    ShowAnalysis,
    RateLike,
    RateDislike,
}

impl Button {
    pub fn label(&self) -> String {
        match self {
            Button::ChooseTask(task) => task.name(),
            Button::ShowAnalysis => "📝 Подробный анализ".to_string(),
            Button::RateLike => "👍".to_string(),
            Button::RateDislike => "👎".to_string(),
        }
    }
}

/// 发给用户的一条消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }
}

fn task_menu(text: &str) -> Reply {
    Reply::with_buttons(
        text,
        TaskType::menu().into_iter().map(Button::ChooseTask).collect(),
    )
}

/// 对话引擎的可调参数
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// 详细分析每条消息的字符上限
    pub chunk_limit: usize,
    pub developer_contact: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            developer_contact: String::new(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_limit: config.message_chunk_limit,
            developer_contact: config.developer_contact.clone(),
        }
    }
}

/// 对话引擎
pub struct ConversationEngine {
    sessions: Arc<dyn SessionStore>,
    quota: Arc<dyn QuotaService>,
    ocr: Arc<dyn OcrService>,
    flow: GradingFlow,
    settings: EngineSettings,
    /// 检查编号分配
    next_run: AtomicU64,
}

impl ConversationEngine {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        quota: Arc<dyn QuotaService>,
        ocr: Arc<dyn OcrService>,
        flow: GradingFlow,
        settings: EngineSettings,
    ) -> Self {
        Self {
            sessions,
            quota,
            ocr,
            flow,
            settings,
            next_run: AtomicU64::new(1),
        }
    }

    /// 处理一条命令
    ///
    /// # 参数
    /// - `user`: 发出命令的用户
    /// - `command`: 命令
    /// - `status`: 评分过程中的进度通知
    ///
    /// # 返回
    /// 按顺序发送给用户的消息
    pub async fn handle(
        &self,
        user: &UserRef,
        command: Command,
        status: &dyn StatusSink,
    ) -> Vec<Reply> {
        let user_id = user.id;
        match command {
            Command::Start => {
                self.enter(user).await;
                vec![task_menu(WELCOME)]
            }
            Command::NewTask => {
                self.enter(user).await;
                vec![task_menu(CHOOSE_TASK)]
            }
            Command::Cancel => {
                self.sessions.delete(user_id).await;
                info!("[用户 {}] 🛑 已取消", user_id);
                vec![Reply::text(CANCELLED)]
            }
            Command::Feedback => {
                self.sessions.delete(user_id).await;
                let contact = self.settings.developer_contact.trim();
                if contact.is_empty() {
                    vec![Reply::text(FEEDBACK)]
                } else {
                    vec![Reply::text(format!("{}\n{}", FEEDBACK, contact))]
                }
            }
            Command::Rate(rating) => {
                info!("[用户 {}] 对分析的评价: {:?}", user_id, rating);
                let text = match rating {
                    Rating::Like => RATED_LIKE,
                    Rating::Dislike => RATED_DISLIKE,
                };
                vec![Reply::text(text)]
            }
            command => match self.sessions.get(user_id).await {
                Some(state) => {
                    debug!("[用户 {}] 状态 {} 收到命令", user_id, state.name());
                    self.advance(user, state, command, status).await
                }
                None => vec![Reply::text(NO_SESSION)],
            },
        }
    }

    async fn enter(&self, user: &UserRef) {
        if !self.quota.register_user(user).await {
            warn!("[用户 {}] ⚠️ 用户注册失败，继续对话", user.id);
        }
        self.sessions.put(user.id, DialogState::ChooseTask).await;
    }

    async fn advance(
        &self,
        user: &UserRef,
        state: DialogState,
        command: Command,
        status: &dyn StatusSink,
    ) -> Vec<Reply> {
        let user_id = user.id;
        match (state, command) {
            (DialogState::ChooseTask, Command::SelectTask(code)) => {
                let task = TaskType::from_code(&code);
                info!("[用户 {}] 选择了任务 {}", user_id, task);
                self.sessions
                    .put(user_id, DialogState::TaskDescription { task: task.clone() })
                    .await;
                vec![Reply::text(task.name()), Reply::text(ASK_DESCRIPTION)]
            }
            (DialogState::ChooseTask, _) => vec![task_menu(CHOOSE_TASK)],

            (DialogState::TaskDescription { task }, Command::SubmitText(description)) => {
                let requires_image = self.flow.sequencer().rubric_for(&task).requires_image;
                if requires_image {
                    self.sessions
                        .put(user_id, DialogState::GraphImage { task, description })
                        .await;
                    vec![Reply::text(ASK_GRAPH)]
                } else {
                    self.sessions
                        .put(
                            user_id,
                            DialogState::TaskSolution {
                                task,
                                description,
                                graph: None,
                            },
                        )
                        .await;
                    vec![Reply::text(ASK_SOLUTION)]
                }
            }
            (DialogState::TaskDescription { .. }, _) => vec![Reply::text(ASK_DESCRIPTION)],

            (
                DialogState::GraphImage { task, description },
                Command::SubmitImage { bytes, file_name },
            ) => {
                let graph = self.process_graph(user_id, &bytes, &file_name).await;
                self.sessions
                    .put(
                        user_id,
                        DialogState::TaskSolution {
                            task,
                            description,
                            graph: Some(graph),
                        },
                    )
                    .await;
                vec![Reply::text(GRAPH_DONE), Reply::text(ASK_SOLUTION)]
            }
            (DialogState::GraphImage { .. }, _) => vec![Reply::text(ASK_GRAPH_AGAIN)],

            (
                DialogState::TaskSolution {
                    task,
                    description,
                    graph,
                },
                Command::SubmitText(solution),
            ) => {
                self.check(user_id, task, &description, &solution, graph.as_ref(), status)
                    .await
            }
            (DialogState::TaskSolution { .. }, _) => vec![Reply::text(ASK_SOLUTION)],

            (DialogState::Checking { .. }, _) => vec![Reply::text(CHECK_IN_PROGRESS)],

            (DialogState::ShowAnalysis { feedback, .. }, Command::RequestDetails) => {
                self.sessions.delete(user_id).await;
                info!("[用户 {}] 📖 发送详细分析", user_id);
                self.details(&feedback)
            }
            (DialogState::ShowAnalysis { .. }, _) => vec![Reply::text(DETAILS_HINT)],
        }
    }

    /// 编码图片并识别文字；OCR 失败时继续对话
    async fn process_graph(&self, user_id: i64, bytes: &[u8], file_name: &str) -> GraphArtifacts {
        let ocr_text = match self.ocr.recognize(bytes, file_name).await {
            Ok(text) => text,
            Err(e) => {
                warn!("[用户 {}] ⚠️ 图表 OCR 失败，继续: {:#}", user_id, e);
                String::new()
            }
        };
        GraphArtifacts {
            image_data_url: Some(encode_data_url(bytes)),
            ocr_text,
        }
    }

    async fn check(
        &self,
        user_id: i64,
        task: TaskType,
        description: &str,
        solution: &str,
        graph: Option<&GraphArtifacts>,
        status: &dyn StatusSink,
    ) -> Vec<Reply> {
        let decision = self.quota.can_proceed(user_id).await;
        if !decision.allowed {
            self.sessions.delete(user_id).await;
            let reason = decision.reason.as_deref().unwrap_or("Неизвестная ошибка");
            info!("[用户 {}] 🚫 额度不足: {}", user_id, reason);
            return vec![Reply::text(format!(
                "❌ {}\n\nБесплатных проверок осталось: {}\n\nДля продолжения необходимо оформить подписку. Используйте команду /subscription",
                reason, decision.free_checks_left
            ))];
        }

        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .put(
                user_id,
                DialogState::Checking {
                    task: task.clone(),
                    run_id,
                },
            )
            .await;
        notify(status, CHECK_STARTED).await;

        let ctx = CheckCtx::new(user_id, task.clone());
        let submission = Submission {
            task: &task,
            description,
            solution,
            graph,
        };
        let outcome = self.flow.run(&ctx, submission, status).await;

        match outcome {
            Ok(GradingOutcome::Graded { report, record }) => {
                let next = DialogState::ShowAnalysis {
                    task,
                    feedback: report.feedback,
                };
                if !self.sessions.finish_check(user_id, run_id, Some(next)).await {
                    info!("{} 会话已取消或已重新开始，丢弃检查结果", ctx);
                    return Vec::new();
                }
                if !self.quota.decrement_free_checks(user_id).await {
                    warn!("{} ⚠️ 免费次数扣减失败（忽略）", ctx);
                }
                if let Some(record) = record {
                    self.flow.deliver(&ctx, record);
                }
                vec![Reply::with_buttons(report.summary, vec![Button::ShowAnalysis])]
            }
            Ok(GradingOutcome::Rejected { message, .. }) => {
                if !self.sessions.finish_check(user_id, run_id, None).await {
                    info!("{} 会话已取消或已重新开始，丢弃检查结果", ctx);
                    return Vec::new();
                }
                vec![Reply::text(message)]
            }
            Err(e) => {
                error!("{} ❌ 检查失败: {:#}", ctx, e);
                if !self.sessions.finish_check(user_id, run_id, None).await {
                    info!("{} 会话已取消或已重新开始，不再提示失败", ctx);
                    return Vec::new();
                }
                vec![Reply::text(CHECK_FAILED)]
            }
        }
    }

    /// 分页发送详细分析，最后一页附带评价按钮
    fn details(&self, feedback: &str) -> Vec<Reply> {
        let limit = self
            .settings
            .chunk_limit
            .saturating_sub(DETAILS_HEADER.chars().count());
        let mut chunks = paginate(feedback, limit);
        if chunks.is_empty() {
            chunks.push("Анализ недоступен".to_string());
        }

        let last = chunks.len() - 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let text = if i == 0 {
                    format!("{}{}", DETAILS_HEADER, chunk)
                } else {
                    chunk
                };
                if i == last {
                    Reply::with_buttons(text, vec![Button::RateLike, Button::RateDislike])
                } else {
                    Reply::text(text)
                }
            })
            .collect()
    }
}
