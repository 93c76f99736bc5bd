//! 控制台传输层 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载细则、创建客户端、组装对话引擎
//! 2. **读取输入**：逐行读取标准输入，解析为对话命令
//! 3. **输出回复**：打印回复文本与按钮，进度通知实时输出
//!
//! 多行作答用 `/text` 开始、`/end` 结束。

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::clients::{
    BackendClient, DisabledOcr, InMemoryQuota, LlmClient, LoggingResultSink, OcrService,
    OcrSpaceClient, QuotaService, ResultSink,
};
use crate::config::Config;
use crate::models::{load_rubrics, UserRef};
use crate::services::evaluator::{RetryPolicy, RetryingEvaluator};
use crate::services::prompt_sequencer::PromptSequencer;
use crate::services::status::StatusSink;
use crate::services::templates::PromptDirectory;
use crate::utils::logging::log_startup;
use crate::workflow::dialogue::{Command, ConversationEngine, EngineSettings, Rating, Reply};
use crate::workflow::grading_flow::GradingFlow;
use crate::workflow::session::InMemorySessionStore;

const HELP: &str = "Команды: /start /new /task <37|38> /image <путь> /text … /end /details /cancel /feedback /like /dislike /help /quit";

/// 一行控制台输入的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleInput {
    Command(Command),
    /// 读取图片文件后提交
    Image(String),
    BeginText,
    EndText,
    Help,
    Quit,
    Empty,
}

fn parse_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };
    match head {
        "/start" => ConsoleInput::Command(Command::Start),
        "/new" => ConsoleInput::Command(Command::NewTask),
        "/task" => ConsoleInput::Command(Command::SelectTask(rest.to_string())),
        "/image" => ConsoleInput::Image(rest.to_string()),
        "/details" => ConsoleInput::Command(Command::RequestDetails),
        "/cancel" => ConsoleInput::Command(Command::Cancel),
        "/feedback" => ConsoleInput::Command(Command::Feedback),
        "/like" => ConsoleInput::Command(Command::Rate(Rating::Like)),
        "/dislike" => ConsoleInput::Command(Command::Rate(Rating::Dislike)),
        "/text" => ConsoleInput::BeginText,
        "/end" => ConsoleInput::EndText,
        "/help" => ConsoleInput::Help,
        "/quit" | "/exit" => ConsoleInput::Quit,
        _ => ConsoleInput::Command(Command::SubmitText(trimmed.to_string())),
    }
}

fn print_reply(reply: &Reply) {
    println!("\n{}", reply.text);
    if !reply.buttons.is_empty() {
        let labels: Vec<String> = reply.buttons.iter().map(|b| b.label()).collect();
        println!("[ {} ]", labels.join(" | "));
    }
}

/// 进度通知直接打印到终端
struct ConsoleStatus;

#[async_trait]
impl StatusSink for ConsoleStatus {
    async fn update(&self, text: &str) -> Result<()> {
        println!("  … {}", text);
        Ok(())
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    engine: ConversationEngine,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let rubrics = Arc::new(
            load_rubrics(&config.rubric_file)
                .await
                .context("无法加载评分细则")?,
        );

        let llm = LlmClient::new(&config);
        info!("🤖 评估模型: {}", llm.model_name());
        let evaluator = Arc::new(RetryingEvaluator::new(llm, RetryPolicy::from_config(&config)));
        let templates = Arc::new(PromptDirectory::new(&config.prompts_dir));
        let sequencer = PromptSequencer::new(evaluator, templates, rubrics);

        let (quota, sink): (Arc<dyn QuotaService>, Arc<dyn ResultSink>) =
            if config.backend_enabled() {
                info!("🌐 后端: {}", config.backend_api_base_url);
                let backend = Arc::new(BackendClient::new(&config));
                (backend.clone(), backend)
            } else {
                warn!("⚠️ 未配置 API_BASE_URL，使用内存额度，评分记录不上报");
                (
                    Arc::new(InMemoryQuota::new(config.initial_free_checks)),
                    Arc::new(LoggingResultSink),
                )
            };

        let ocr: Arc<dyn OcrService> = if config.ocr_api_key.trim().is_empty() {
            warn!("⚠️ 未配置 OCR_API_KEY，图表识别将被跳过");
            Arc::new(DisabledOcr)
        } else {
            Arc::new(OcrSpaceClient::new(&config))
        };

        let engine = ConversationEngine::new(
            Arc::new(InMemorySessionStore::new()),
            quota,
            ocr,
            GradingFlow::new(sequencer, sink),
            EngineSettings::from_config(&config),
        );

        Ok(Self { config, engine })
    }

    /// 运行应用主逻辑：读取标准输入直到 EOF 或 /quit
    pub async fn run(&self) -> Result<()> {
        let user = UserRef::new(
            self.config.console_user_id,
            std::env::var("USER").ok(),
        );
        let status = ConsoleStatus;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut draft: Option<Vec<String>> = None;

        println!("{}", HELP);
        while let Some(line) = lines.next_line().await.context("读取标准输入失败")? {
            if let Some(buffer) = draft.as_mut() {
                if parse_line(&line) == ConsoleInput::EndText {
                    let text = buffer.join("\n");
                    draft = None;
                    self.dispatch(&user, Command::SubmitText(text), &status).await;
                } else {
                    buffer.push(line);
                }
                continue;
            }

            match parse_line(&line) {
                ConsoleInput::Command(command) => self.dispatch(&user, command, &status).await,
                ConsoleInput::Image(path) => match read_image(&path).await {
                    Ok(command) => self.dispatch(&user, command, &status).await,
                    Err(e) => println!("\n❌ {:#}", e),
                },
                ConsoleInput::BeginText => draft = Some(Vec::new()),
                ConsoleInput::EndText | ConsoleInput::Empty => {}
                ConsoleInput::Help => println!("{}", HELP),
                ConsoleInput::Quit => break,
            }
        }

        info!("👋 控制台会话结束");
        Ok(())
    }

    async fn dispatch(&self, user: &UserRef, command: Command, status: &ConsoleStatus) {
        for reply in self.engine.handle(user, command, status).await {
            print_reply(&reply);
        }
    }
}

async fn read_image(path: &str) -> Result<Command> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("无法读取图片: {}", path))?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image.jpg")
        .to_string();
    Ok(Command::SubmitImage { bytes, file_name })
}
