use std::io;
use std::time::Duration;
/// インフラ層のエラー定義
///
/// 外部システム（ファイルシステム、ネットワーク、YouTube API、OAuthサーバー）との
/// やり取りで発生するエラーを構造化して定義。
/// #[from] / #[source] を使って原因連鎖を保持する。
///
/// 再試行の可否は `api::retry::classify` が決める。
use crate::api::types::GoogleErrorEnvelope;
use crate::domain::DomainError;
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

/// 日次クォータ超過を示す YouTube のエラー理由
const DAILY_QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded", "uploadLimitExceeded"];

/// 短時間のレート制限を示すエラー理由
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Error, Debug)]
pub enum InfraError {
    /// ネットワークエラー（接続失敗・切断など）
    #[error("network error: {message}")]
    Network { message: String },

    /// タイムアウトエラー
    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    /// レート制限（HTTP 429 / 403 rateLimitExceeded）
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// 日次クォータ超過（翌日まで回復しない）
    #[error("daily quota exceeded ({reason}): {message}")]
    DailyQuotaExceeded { reason: String, message: String },

    /// 認証情報・トークンが拒否された
    #[error("authentication rejected: {message}")]
    AuthenticationRejected { message: String },

    /// リソースが存在しない
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// API通信エラー
    #[error("API error: {endpoint} - {message}")]
    Api {
        endpoint: String,
        message: String,
        status_code: Option<u16>,
    },

    /// 再試行の上限に達した
    #[error("{operation} failed after {attempts} attempt(s)")]
    UploadExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<InfraError>,
    },

    /// その他のI/Oエラー
    #[error("I/O error")]
    Io(#[from] io::Error),
}

impl InfraError {
    /// ネットワークエラーを作成
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn authentication_rejected(message: impl Into<String>) -> Self {
        Self::AuthenticationRejected {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn api(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
            status_code,
        }
    }

    pub fn exhausted(operation: impl Into<String>, attempts: u32, last: InfraError) -> Self {
        Self::UploadExhausted {
            operation: operation.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// HTTPエラーレスポンスを分類する
    ///
    /// # 分類
    /// - 401 → AuthenticationRejected
    /// - 403 quotaExceeded 系 → DailyQuotaExceeded
    /// - 429 / 403 rateLimitExceeded 系 → RateLimited
    /// - その他の 403 → AuthenticationRejected
    /// - 404 → NotFound
    /// - 408 → Timeout
    /// - それ以外 → Api（5xx は再試行対象）
    pub fn from_status(
        endpoint: &str,
        status_code: u16,
        body: &str,
        retry_after: Option<Duration>,
    ) -> Self {
        let envelope = GoogleErrorEnvelope::parse(body);
        let message = envelope
            .as_ref()
            .map(|e| e.message().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status_code));
        let has_reason = |reasons: &[&str]| {
            envelope
                .as_ref()
                .and_then(|e| e.reasons().find(|r| reasons.contains(r)))
                .map(str::to_string)
        };

        match status_code {
            401 => Self::authentication_rejected(message),
            403 => {
                if let Some(reason) = has_reason(DAILY_QUOTA_REASONS) {
                    Self::DailyQuotaExceeded { reason, message }
                } else if has_reason(RATE_LIMIT_REASONS).is_some() {
                    Self::RateLimited {
                        message,
                        retry_after,
                    }
                } else {
                    Self::authentication_rejected(message)
                }
            }
            404 => Self::not_found(format!("{} ({})", endpoint, message)),
            408 => Self::timeout(endpoint),
            429 => Self::RateLimited {
                message,
                retry_after,
            },
            _ => Self::api(endpoint, message, Some(status_code)),
        }
    }

    /// サーバーが指定した再試行までの待機時間
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// エラーの深刻度を返す
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UploadExhausted { .. }
            | Self::RateLimited { .. }
            | Self::DailyQuotaExceeded { .. } => ErrorSeverity::RetryLater,
            Self::AuthenticationRejected { .. } => ErrorSeverity::ConfigError,
            Self::NotFound { .. } => ErrorSeverity::UserError,
            Self::Api {
                status_code: Some(code),
                ..
            } if (400..500).contains(code) => ErrorSeverity::UserError,
            Self::Network { .. } | Self::Timeout { .. } | Self::Api { .. } | Self::Io(_) => {
                ErrorSeverity::SystemError
            }
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Network { .. } => Some("Check your internet connection and try again"),
            Self::Timeout { .. } => Some("The server did not respond in time. Try again later"),
            Self::RateLimited { .. } => Some("YouTube is rate limiting requests. Wait a moment and retry"),
            Self::DailyQuotaExceeded { .. } => {
                Some("The daily YouTube API quota is used up. It resets at midnight Pacific Time")
            }
            Self::AuthenticationRejected { .. } => {
                Some("Run 'tubeyeet login' to authorize again, and check your OAuth client credentials")
            }
            Self::NotFound { .. } => Some("Check the video ID"),
            Self::UploadExhausted { .. } => {
                Some("All retry attempts failed. Schedule the upload for a later run")
            }
            Self::Api { .. } | Self::Io(_) => None,
        }
    }
}

/// Authenticator / UploadClient が返すエラー
///
/// ネットワークに到達する前の事前条件違反（Domain）と、
/// 外部とのやり取りの失敗（Infra）を区別する。
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl ClientError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Domain(e) => e.severity(),
            Self::Infra(e) => e.severity(),
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Domain(e) => e.hint(),
            Self::Infra(e) => e.hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(reason: &str) -> String {
        format!(
            r#"{{"error":{{"code":403,"message":"msg for {reason}","errors":[{{"reason":"{reason}","domain":"youtube.quota"}}]}}}}"#
        )
    }

    #[test]
    fn test_unauthorized_is_rejected() {
        let err = InfraError::from_status("videos", 401, "", None);
        assert!(matches!(err, InfraError::AuthenticationRejected { .. }));
        assert_eq!(err.severity(), ErrorSeverity::ConfigError);
    }

    #[test]
    fn test_forbidden_reasons() {
        for reason in DAILY_QUOTA_REASONS {
            let err = InfraError::from_status("videos", 403, &body(reason), None);
            assert!(
                matches!(err, InfraError::DailyQuotaExceeded { .. }),
                "{reason} should be a daily quota error"
            );
        }

        let err = InfraError::from_status(
            "videos",
            403,
            &body("userRateLimitExceeded"),
            Some(Duration::from_secs(5)),
        );
        assert!(matches!(err, InfraError::RateLimited { .. }));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

        let err = InfraError::from_status("videos", 403, &body("forbidden"), None);
        assert!(matches!(err, InfraError::AuthenticationRejected { .. }));
    }

    #[test]
    fn test_other_statuses() {
        assert!(matches!(
            InfraError::from_status("videos", 429, "", None),
            InfraError::RateLimited { .. }
        ));
        assert!(matches!(
            InfraError::from_status("videos", 404, "", None),
            InfraError::NotFound { .. }
        ));
        assert!(matches!(
            InfraError::from_status("videos", 408, "", None),
            InfraError::Timeout { .. }
        ));

        let err = InfraError::from_status("videos", 503, "Service Unavailable", None);
        assert!(matches!(
            err,
            InfraError::Api {
                status_code: Some(503),
                ..
            }
        ));
        assert_eq!(err.severity(), ErrorSeverity::SystemError);

        let err = InfraError::from_status("videos", 400, "", None);
        assert_eq!(err.severity(), ErrorSeverity::UserError);
    }

    #[test]
    fn test_message_from_google_envelope() {
        let err = InfraError::from_status("videos", 403, &body("forbidden"), None);
        assert_eq!(err.to_string(), "authentication rejected: msg for forbidden");

        let err = InfraError::from_status("videos", 500, "<html>oops</html>", None);
        assert_eq!(err.to_string(), "API error: videos - HTTP 500");
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = InfraError::exhausted("upload", 3, InfraError::network("reset"));
        assert_eq!(err.to_string(), "upload failed after 3 attempt(s)");
        assert_eq!(err.severity(), ErrorSeverity::RetryLater);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("network error: reset"));
    }

    #[test]
    fn test_client_error_delegates() {
        let err: ClientError = DomainError::missing_credentials("api_key").into();
        assert_eq!(err.severity(), ErrorSeverity::ConfigError);
        assert!(matches!(err, ClientError::Domain(_)));

        let err: ClientError = InfraError::network("down").into();
        assert!(err.hint().is_some());
        assert!(matches!(err, ClientError::Infra(_)));
    }
}
