//! # CheckMate
//!
//! 检查 ЕГЭ 英语 37 / 38 题作答的对话式评分机器人
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 外部服务，对上只暴露 trait
//! - `LlmClient` - OpenAI 兼容的评估模型
//! - `OcrSpaceClient` - 图表文字识别
//! - `BackendClient` - 用户额度与评分记录上报
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单份作答
//! - `word_gate` - 字数门槛与截断
//! - `PromptSequencer` - 按细则逐条调用评估器
//! - `score_extractor` - 从回答中提取分数
//! - `aggregation` / `feedback` - 汇总与评语组装
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次检查"和"一段对话"
//! - `GradingFlow` - 评分流程（字数 → 评分 → 汇总 → 上报）
//! - `ConversationEngine` - 对话状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/console` - 控制台传输层，组装全部依赖
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Rubric, RubricSet, TaskType};
pub use orchestrator::App;
pub use services::{GradeReport, PromptSequencer};
pub use workflow::{Command, ConversationEngine, GradingFlow, Reply};
