//! 检查上下文
//!
//! 封装"我正在为哪个用户检查哪道题"这一信息

use std::fmt::Display;

use crate::models::TaskType;
use crate::workflow::session::UserId;

/// 检查上下文
#[derive(Debug, Clone)]
pub struct CheckCtx {
    pub user_id: UserId,
    pub task: TaskType,
}

impl CheckCtx {
    pub fn new(user_id: UserId, task: TaskType) -> Self {
        Self { user_id, task }
    }
}

impl Display for CheckCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[用户 {} 任务 {}]", self.user_id, self.task.code())
    }
}
