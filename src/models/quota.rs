/// 用户标识（聊天平台的用户 ID 与用户名）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub username: Option<String>,
}

impl UserRef {
    pub fn new(id: i64, username: Option<String>) -> Self {
        Self { id, username }
    }
}

/// 额度检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// 拒绝原因（仅在 `allowed == false` 时存在）
    pub reason: Option<String>,
    pub free_checks_left: i64,
}

/// 免费次数用尽时的拒绝原因
pub const FREE_CHECKS_EXHAUSTED: &str =
    "Закончились бесплатные проверки. Необходимо оформить подписку";

impl QuotaDecision {
    pub fn allow(free_checks_left: i64) -> Self {
        Self {
            allowed: true,
            reason: None,
            free_checks_left,
        }
    }

    pub fn deny(reason: impl Into<String>, free_checks_left: i64) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            free_checks_left,
        }
    }

    /// 根据订阅状态与剩余免费次数作出决定
    ///
    /// 订阅有效时总是允许；否则需要剩余免费次数大于 0
    pub fn from_account(is_active: bool, free_checks_left: i64) -> Self {
        if is_active || free_checks_left > 0 {
            Self::allow(free_checks_left)
        } else {
            Self::deny(FREE_CHECKS_EXHAUSTED, free_checks_left)
        }
    }
}
