//! 流程层（Workflow）
//!
//! - `grading_flow`：一份作答的评分流程（字数门槛 → 逐条评分 → 汇总 → 上报）
//! - `dialogue`：对话状态机，把用户命令映射到状态转移和回复
//! - `session`：每个用户一份对话状态

pub mod check_ctx;
pub mod dialogue;
pub mod grading_flow;
pub mod session;

pub use check_ctx::CheckCtx;
pub use dialogue::{Button, Command, ConversationEngine, EngineSettings, Rating, Reply};
pub use grading_flow::{GradingFlow, GradingOutcome, Submission};
pub use session::{DialogState, GraphArtifacts, InMemorySessionStore, SessionStore};
