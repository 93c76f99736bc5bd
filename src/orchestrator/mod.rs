//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有全部资源（客户端、会话存储、对话引擎），把传输层的输入交给流程层。
//! 本层不做业务判断，只负责组装和调度。
//!
//! ## 层次关系
//!
//! ```text
//! console::App (标准输入 → Command)
//!     ↓
//! workflow::ConversationEngine (状态机)
//!     ↓
//! workflow::GradingFlow (单份作答)
//!     ↓
//! services (能力层：字数 / 序列 / 提取 / 汇总)
//!     ↓
//! clients (LLM / OCR / 后端)
//! ```

pub mod console;

pub use console::App;
