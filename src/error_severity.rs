//! 終了コードを決める4つのエラー分類
//!
//! 各層のエラー（`DomainError` / `InfraError` / `ConfigError`）が `severity()` でこれを返し、
//! `main` がエラーチェーンから拾って終了コードにする。分類できないエラーは `UserError` 扱い。

use std::fmt;

/// エラーの分類と対応する終了コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// 引数・入力の誤り
    ///
    /// 動画ファイルが無い、メタデータが不正、動画IDが存在しないなど。
    ///
    /// **Exit Code: 1**
    UserError,

    /// 認証情報・設定の誤り
    ///
    /// 認証情報の欠落、OAuth の交換拒否、config.toml の不正など。
    ///
    /// **Exit Code: 2**
    ConfigError,

    /// 外部要因による失敗
    ///
    /// 認証中の通信失敗、API の 5xx、ファイルシステム障害など。
    ///
    /// **Exit Code: 3**
    SystemError,

    /// 再試行予算の枯渇またはクォータ超過
    ///
    /// 時間を置いて再実行すれば成功する可能性がある。
    ///
    /// **Exit Code: 4**
    RetryLater,
}

impl ErrorSeverity {
    /// 対応する Unix 終了コードを返す
    pub fn exit_code(self) -> i32 {
        match self {
            Self::UserError => 1,
            Self::ConfigError => 2,
            Self::SystemError => 3,
            Self::RetryLater => 4,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserError => write!(f, "user error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::SystemError => write!(f, "system error"),
            Self::RetryLater => write!(f, "retry budget exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorSeverity::UserError.exit_code(), 1);
        assert_eq!(ErrorSeverity::ConfigError.exit_code(), 2);
        assert_eq!(ErrorSeverity::SystemError.exit_code(), 3);
        assert_eq!(ErrorSeverity::RetryLater.exit_code(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorSeverity::UserError.to_string(), "user error");
        assert_eq!(
            ErrorSeverity::ConfigError.to_string(),
            "configuration error"
        );
        assert_eq!(ErrorSeverity::SystemError.to_string(), "system error");
        assert_eq!(
            ErrorSeverity::RetryLater.to_string(),
            "retry budget exhausted"
        );
    }
}
