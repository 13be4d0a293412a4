/// 再試行ポリシー
///
/// 上限回数付きの指数バックオフ。構築時に検証されるので、
/// 上限が無限や0回になることはない。
use crate::config::APP_CONFIG;
use crate::domain::error::DomainError;
use std::time::Duration;

/// 試行回数の上限として許容する最大値
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// # Errors
    /// - `max_attempts` が 1..=10 の範囲外
    /// - `base_delay` が `max_delay` より大きい
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, DomainError> {
        if max_attempts == 0 || max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(DomainError::invalid_argument(
                "max_attempts",
                format!("must be between 1 and {}, got {}", MAX_ATTEMPTS_LIMIT, max_attempts),
            ));
        }
        if base_delay > max_delay {
            return Err(DomainError::invalid_argument(
                "base_delay",
                format!(
                    "({} ms) must not exceed max_delay ({} ms)",
                    base_delay.as_millis(),
                    max_delay.as_millis()
                ),
            ));
        }

        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            attempt_timeout: Duration::from_secs(APP_CONFIG.upload.attempt_timeout_seconds),
        })
    }

    /// 1回の試行に許す時間を変更する（0は不可）
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Result<Self, DomainError> {
        if timeout.is_zero() {
            return Err(DomainError::invalid_argument(
                "attempt_timeout",
                "must be greater than zero",
            ));
        }
        self.attempt_timeout = timeout;
        Ok(self)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// `attempt` 回目（1始まり）が失敗した後の待機時間
    ///
    /// `base · 2^(attempt-1)` を `max_delay` で頭打ちにする。
    /// サーバーが Retry-After を返した場合はそれより短くしないが、
    /// その値も `max_delay` で頭打ちにする。
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let backoff = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        match retry_after {
            Some(hint) => backoff.max(hint.min(self.max_delay)),
            None => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            attempt_timeout: Duration::from_secs(APP_CONFIG.upload.attempt_timeout_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_cap_must_be_finite_and_positive() {
        assert!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).is_err());
        assert!(RetryPolicy::new(MAX_ATTEMPTS_LIMIT + 1, Duration::ZERO, Duration::ZERO).is_err());
        assert!(RetryPolicy::new(1, Duration::ZERO, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_base_delay_not_above_max() {
        let result = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(1));
        assert!(matches!(result, Err(DomainError::InvalidArgument { .. })));
    }

    #[test]
    fn test_exponential_growth_with_cap() {
        let policy =
            RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(3)).unwrap();
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2, None), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4, None), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40, None), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_is_honoured_when_longer() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        assert_eq!(
            policy.delay_for(3, Some(Duration::from_millis(10))),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn test_retry_after_is_capped_at_max_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(86_400))),
            DEFAULT_MAX_DELAY
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert!(policy.attempt_timeout() > Duration::ZERO);
        assert!(policy.with_attempt_timeout(Duration::ZERO).is_err());
    }
}
