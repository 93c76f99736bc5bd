//! 内存额度存储（离线运行与测试）

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

use crate::clients::QuotaService;
use crate::models::{QuotaDecision, UserRef};

#[derive(Debug, Default)]
struct QuotaState {
    free_checks: HashMap<i64, i64>,
    subscribers: HashSet<i64>,
}

/// 内存额度存储
///
/// 新用户注册时获得 `initial_free_checks` 次免费检查
#[derive(Debug)]
pub struct InMemoryQuota {
    initial_free_checks: i64,
    state: Mutex<QuotaState>,
}

impl InMemoryQuota {
    pub fn new(initial_free_checks: i64) -> Self {
        Self {
            initial_free_checks,
            state: Mutex::new(QuotaState::default()),
        }
    }

    /// 为用户开通订阅
    pub async fn activate_subscription(&self, user_id: i64) {
        self.state.lock().await.subscribers.insert(user_id);
    }

    /// 直接设置剩余免费次数
    pub async fn set_free_checks(&self, user_id: i64, free_checks: i64) {
        self.state.lock().await.free_checks.insert(user_id, free_checks);
    }

    pub async fn free_checks_left(&self, user_id: i64) -> Option<i64> {
        self.state.lock().await.free_checks.get(&user_id).copied()
    }
}

#[async_trait]
impl QuotaService for InMemoryQuota {
    async fn register_user(&self, user: &UserRef) -> bool {
        let mut state = self.state.lock().await;
        state
            .free_checks
            .entry(user.id)
            .or_insert(self.initial_free_checks);
        true
    }

    async fn can_proceed(&self, user_id: i64) -> QuotaDecision {
        let state = self.state.lock().await;
        let left = state.free_checks.get(&user_id).copied().unwrap_or(0);
        QuotaDecision::from_account(state.subscribers.contains(&user_id), left)
    }

    async fn decrement_free_checks(&self, user_id: i64) -> bool {
        let mut state = self.state.lock().await;
        let left = state.free_checks.entry(user_id).or_insert(0);
        if *left > 0 {
            *left -= 1;
            debug!("[用户 {}] 免费次数剩余 {}", user_id, left);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_grants_initial_checks_once() {
        let quota = InMemoryQuota::new(2);
        let user = UserRef::new(7, None);

        assert!(quota.register_user(&user).await);
        assert!(quota.decrement_free_checks(7).await);
        assert!(quota.register_user(&user).await);
        assert_eq!(quota.free_checks_left(7).await, Some(1));
    }

    #[tokio::test]
    async fn test_exhausted_then_subscribed() {
        let quota = InMemoryQuota::new(1);
        quota.register_user(&UserRef::new(1, None)).await;
        assert!(quota.can_proceed(1).await.allowed);

        quota.decrement_free_checks(1).await;
        quota.decrement_free_checks(1).await;
        assert_eq!(quota.free_checks_left(1).await, Some(0));

        let decision = quota.can_proceed(1).await;
        assert!(!decision.allowed);
        assert_eq!(decision.free_checks_left, 0);

        quota.activate_subscription(1).await;
        assert!(quota.can_proceed(1).await.allowed);
    }

    #[tokio::test]
    async fn test_unknown_user_is_denied() {
        let quota = InMemoryQuota::new(3);
        assert!(!quota.can_proceed(42).await.allowed);
    }
}
