//! 评估服务端口 - 业务能力层
//!
//! `Evaluator` 表示"给一段提示词，返回一段自由文本"的能力；
//! `RetryingEvaluator` 在其上加有限次重试与线性退避。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 文本生成能力
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// 单次生成调用
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl<T: Evaluator + ?Sized> Evaluator for Arc<T> {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).generate(prompt).await
    }
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最多尝试次数（含第一次）
    pub max_attempts: usize,
    /// 第 n 次失败后等待 `base_delay * n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.llm_max_attempts.max(1),
            base_delay: Duration::from_secs(config.llm_retry_delay_secs),
        }
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_after(&self, attempt: usize) -> Duration {
        self.base_delay * attempt as u32
    }
}

/// 带重试的评估器
///
/// 所有错误都会重试；次数耗尽后返回 `LlmError::EvaluationUnavailable`
pub struct RetryingEvaluator<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Evaluator> RetryingEvaluator<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl<E: Evaluator> Evaluator for RetryingEvaluator<E> {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.inner.generate(prompt).await {
                Ok(text) => {
                    debug!("评估调用成功 (尝试 {}/{})", attempt, max_attempts);
                    return Ok(text);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        let delay = self.policy.delay_after(attempt);
                        warn!(
                            "⚠️ 评估调用失败 (尝试 {}/{}), {:?} 后重试: {}",
                            attempt, max_attempts, delay, e
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        error!("❌ 评估调用已尝试 {} 次，全部失败: {}", max_attempts, last_error);
        Err(LlmError::EvaluationUnavailable {
            attempts: max_attempts,
            last_error,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 前 `failures` 次调用失败，之后成功
    struct FlakyEvaluator {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyEvaluator {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Evaluator for FlakyEvaluator {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                anyhow::bail!("timeout #{}", n + 1)
            }
            Ok("Балл: 2".to_string())
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed_waits_two_backoffs() {
        let evaluator = RetryingEvaluator::new(FlakyEvaluator::new(2), policy());

        let start = tokio::time::Instant::now();
        let text = evaluator.generate("prompt").await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(text, "Балл: 2");
        assert_eq!(evaluator.inner.calls.load(Ordering::SeqCst), 3);
        // 5s + 10s
        assert!(elapsed >= Duration::from_secs(15));
        assert!(elapsed < Duration::from_secs(16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_evaluation_unavailable() {
        let evaluator = RetryingEvaluator::new(FlakyEvaluator::new(10), policy());

        let err = evaluator.generate("prompt").await.unwrap_err();
        assert_eq!(evaluator.inner.calls.load(Ordering::SeqCst), 3);

        match err.downcast_ref::<LlmError>() {
            Some(LlmError::EvaluationUnavailable {
                attempts,
                last_error,
            }) => {
                assert_eq!(*attempts, 3);
                assert!(last_error.contains("timeout #3"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_does_not_sleep() {
        let evaluator = RetryingEvaluator::new(FlakyEvaluator::new(0), policy());
        let start = tokio::time::Instant::now();
        evaluator.generate("prompt").await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config {
            llm_max_attempts: 0,
            llm_retry_delay_secs: 2,
            ..Config::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_after(3), Duration::from_secs(6));
    }
}
