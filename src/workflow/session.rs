//! 对话状态与会话存储
//!
//! 每个用户一份会话，以用户 ID 为键，互不共享

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::TaskType;

pub type UserId = i64;

/// 图表图片的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphArtifacts {
    /// data URL 形式的图片
    pub image_data_url: Option<String>,
    /// OCR 识别文本，失败时为空
    pub ocr_text: String,
}

/// 对话状态
///
/// `ChooseTask → TaskDescription → [GraphImage] → TaskSolution → Checking → ShowAnalysis`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    ChooseTask,
    TaskDescription {
        task: TaskType,
    },
    GraphImage {
        task: TaskType,
        description: String,
    },
    TaskSolution {
        task: TaskType,
        description: String,
        graph: Option<GraphArtifacts>,
    },
    Checking {
        task: TaskType,
        /// 本次检查的编号，取消后重新开始的检查编号不同
        run_id: u64,
    },
    ShowAnalysis {
        task: TaskType,
        feedback: String,
    },
}

impl DialogState {
    /// 状态名（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            DialogState::ChooseTask => "ChooseTask",
            DialogState::TaskDescription { .. } => "TaskDescription",
            DialogState::GraphImage { .. } => "GraphImage",
            DialogState::TaskSolution { .. } => "TaskSolution",
            DialogState::Checking { .. } => "Checking",
            DialogState::ShowAnalysis { .. } => "ShowAnalysis",
        }
    }

    /// 是否是编号为 `run_id` 的检查
    pub fn is_check_run(&self, run_id: u64) -> bool {
        matches!(self, DialogState::Checking { run_id: id, .. } if *id == run_id)
    }
}

/// 会话存储
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Option<DialogState>;
    async fn put(&self, user_id: UserId, state: DialogState);
    async fn delete(&self, user_id: UserId) -> Option<DialogState>;

    /// 仅当会话仍是编号为 `run_id` 的检查时，写入 `next`（`None` 表示删除会话）
    ///
    /// # 返回
    /// 是否写入
    async fn finish_check(&self, user_id: UserId, run_id: u64, next: Option<DialogState>) -> bool;
}

/// 进程内会话存储
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, DialogState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: UserId) -> Option<DialogState> {
        self.sessions.read().await.get(&user_id).cloned()
    }

    async fn put(&self, user_id: UserId, state: DialogState) {
        self.sessions.write().await.insert(user_id, state);
    }

    async fn delete(&self, user_id: UserId) -> Option<DialogState> {
        self.sessions.write().await.remove(&user_id)
    }

    async fn finish_check(&self, user_id: UserId, run_id: u64, next: Option<DialogState>) -> bool {
        let mut sessions = self.sessions.write().await;
        if !sessions.get(&user_id).is_some_and(|s| s.is_check_run(run_id)) {
            return false;
        }
        match next {
            Some(state) => sessions.insert(user_id, state),
            None => sessions.remove(&user_id),
        };
        true
    }
}
