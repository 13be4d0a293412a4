/// ドメイン層のエラー定義
///
/// 事前条件（認証情報・メタデータ・アップロード対象ファイル・セッション）の
/// 違反を構造化して定義する。
/// これらのエラーはネットワーク層に到達する前に返され、再試行の対象にならない。
use crate::error_severity::ErrorSeverity;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 必須の認証情報が空
    #[error("missing credentials: {field} is empty")]
    MissingCredentials { field: String },

    /// 動画メタデータが無効
    #[error("invalid video metadata: {reason}")]
    InvalidMetadata { reason: String },

    /// アップロード対象ファイルが存在しない、空、または読み込めない
    #[error("artifact not found: {path} ({reason})")]
    ArtifactNotFound { path: String, reason: String },

    /// セッションが無効（期限切れ）
    #[error("not authenticated: session is expired or empty, cannot {operation}")]
    NotAuthenticated { operation: String },

    /// 引数が無効
    #[error("invalid argument: {name} {reason}")]
    InvalidArgument { name: String, reason: String },
}

impl DomainError {
    pub fn missing_credentials(field: impl Into<String>) -> Self {
        Self::MissingCredentials {
            field: field.into(),
        }
    }

    pub fn invalid_metadata(reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            reason: reason.into(),
        }
    }

    pub fn artifact_not_found(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactNotFound {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_authenticated(operation: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            operation: operation.into(),
        }
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// エラーの深刻度を返す
    ///
    /// 終了コードの決定に使用できる
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingCredentials { .. } => ErrorSeverity::ConfigError,
            Self::InvalidMetadata { .. }
            | Self::ArtifactNotFound { .. }
            | Self::NotAuthenticated { .. }
            | Self::InvalidArgument { .. } => ErrorSeverity::UserError,
        }
    }

    /// ユーザー向けのヒントメッセージを返す
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::MissingCredentials { .. } => Some(
                "Set YOUTUBE_API_KEY, YOUTUBE_CLIENT_ID and YOUTUBE_CLIENT_SECRET (or provide client_secrets.json).",
            ),
            Self::InvalidMetadata { .. } => Some(
                "Titles must be non-empty and at most 100 characters; privacy must be private, public or unlisted.",
            ),
            Self::ArtifactNotFound { .. } => {
                Some("Please check the video path and ensure the file exists and is not empty.")
            }
            Self::NotAuthenticated { .. } => Some("Run 'tubeyeet login' to obtain a fresh session."),
            Self::InvalidArgument { .. } => None,
        }
    }
}
