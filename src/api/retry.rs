/// 再試行の分類と上限付きの再試行ループ
///
/// `classify` がエラーを再試行可能か致命的かに振り分け、
/// `with_retry` が `RetryPolicy` に従って試行・待機・打ち切りを行う。
use crate::api::error::InfraError;
use crate::domain::progress::UploadPhase;
use crate::domain::RetryPolicy;
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Fatal,
}

/// エラーを再試行可能か致命的かに分類する
///
/// 再試行可能: ネットワーク断、タイムアウト、レート制限、HTTP 5xx
/// 致命的: 認証拒否、日次クォータ超過、存在しないリソース、その他の 4xx、ローカルI/O
pub fn classify(err: &InfraError) -> RetryClass {
    match err {
        InfraError::Network { .. } | InfraError::Timeout { .. } | InfraError::RateLimited { .. } => {
            RetryClass::Retryable
        }
        InfraError::Api {
            status_code: Some(code),
            ..
        } if *code >= 500 => RetryClass::Retryable,
        InfraError::Api { .. }
        | InfraError::AuthenticationRejected { .. }
        | InfraError::DailyQuotaExceeded { .. }
        | InfraError::NotFound { .. }
        | InfraError::UploadExhausted { .. }
        | InfraError::Io(_) => RetryClass::Fatal,
    }
}

/// `policy` に従って `attempt` を繰り返す
///
/// 各試行は `policy.attempt_timeout()` で打ち切られ、タイムアウトは再試行対象になる。
/// 致命的なエラーはそのまま返し、上限に達した場合は `InfraError::UploadExhausted` で包む。
/// `attempt` には1始まりの試行番号が渡される。
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    report: &(dyn Fn(UploadPhase) + Send + Sync),
    mut attempt: F,
) -> Result<T, InfraError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, InfraError>>,
{
    let max_attempts = policy.max_attempts();
    let mut current = 1;

    loop {
        report(UploadPhase::Attempting {
            attempt: current,
            max_attempts,
        });

        let result = match tokio::time::timeout(policy.attempt_timeout(), attempt(current)).await
        {
            Ok(result) => result,
            Err(_) => Err(InfraError::timeout(format!(
                "{} (attempt {} exceeded {}s)",
                operation,
                current,
                policy.attempt_timeout().as_secs()
            ))),
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if classify(&err) == RetryClass::Fatal {
            tracing::debug!(operation, attempt = current, error = %err, "fatal error, not retrying");
            return Err(err);
        }

        if current >= max_attempts {
            tracing::warn!(operation, attempts = current, error = %err, "retry budget exhausted");
            return Err(InfraError::exhausted(operation, current, err));
        }

        let delay = policy.delay_for(current, err.retry_after());
        tracing::warn!(
            operation,
            attempt = current,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retryable error, backing off"
        );
        report(UploadPhase::RetryScheduled {
            attempt: current,
            max_attempts,
            delay_ms: delay.as_millis() as u64,
            reason: err.to_string(),
        });

        tokio::time::sleep(delay).await;
        current += 1;
    }
}
