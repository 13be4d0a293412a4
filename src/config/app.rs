/// アプリケーション設定モジュール
///
/// コンパイル時定数として定義される静的設定を管理します。
/// これらの設定は実行時には変更できません。
/// ユーザーが変更できる値（公開設定やリトライ回数など）は `UserConfig` 側にあります。

/// 1MBあたりのバイト数
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// アプリケーション全体の設定
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub oauth: OAuthConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// YouTube Data API 関連の設定
#[derive(Debug, Clone, Copy)]
pub struct ApiConfig {
    /// Data API のベースURL（videos.list / update / delete）
    pub endpoint: &'static str,

    /// アップロード用のベースURL（videos.insert の resumable upload）
    pub upload_endpoint: &'static str,

    /// 1リクエストあたりのタイムアウト(秒)
    pub timeout_seconds: u64,
}

/// OAuth2 関連の設定
#[derive(Debug, Clone, Copy)]
pub struct OAuthConfig {
    pub auth_url: &'static str,
    pub token_url: &'static str,

    /// 要求するスコープ
    pub scopes: &'static [&'static str],

    /// トークンエンドポイントのタイムアウト(秒)
    pub timeout_seconds: u64,

    /// ブラウザでの承認を待つ最大時間(秒)
    pub authorization_timeout_seconds: u64,

    /// アクセストークンの有効期限から差し引く安全マージン(秒)
    pub expiry_margin_seconds: i64,

    /// expires_in が返されなかった場合に仮定する有効期間(秒)
    pub default_lifetime_seconds: i64,
}

/// アップロード関連の設定
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    /// アップロード可能な最大ファイルサイズ (バイト)
    pub max_file_size: u64,

    /// resumable upload のチャンクサイズ (バイト、256KiBの倍数)
    pub chunk_size: u64,

    /// 1回のアップロード試行全体のタイムアウト(秒)
    pub attempt_timeout_seconds: u64,

    /// 対応する動画フォーマット
    pub supported_formats: &'static [&'static str],

    /// 既定のクォータ(10,000 units/日)で1日にアップロードできる本数の目安
    pub daily_upload_budget: usize,

    /// 動画の視聴URLのプレフィックス
    pub watch_url_prefix: &'static str,

    /// `status --wait` の確認間隔(秒)
    pub poll_interval_seconds: u64,

    /// `status --wait` の最大待機時間(秒)
    pub max_wait_seconds: u64,

    /// カスタムサムネイルの最大サイズ (バイト)
    pub max_thumbnail_size: u64,

    /// 対応するサムネイル画像フォーマット
    pub thumbnail_formats: &'static [&'static str],
}

/// ロギング関連の設定
#[derive(Debug, Clone, Copy)]
pub struct LoggingConfig {
    /// RUST_LOG が未設定の場合のフィルタ
    pub default_filter: &'static str,

    /// --verbose 指定時のフィルタ
    pub verbose_filter: &'static str,
}

/// ビルド時に確定するアプリケーション設定
pub const APP_CONFIG: AppConfig = AppConfig {
    api: ApiConfig {
        endpoint: "https://www.googleapis.com/youtube/v3",
        upload_endpoint: "https://www.googleapis.com/upload/youtube/v3",
        timeout_seconds: 30,
    },
    oauth: OAuthConfig {
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        scopes: &[
            "https://www.googleapis.com/auth/youtube.upload",
            "https://www.googleapis.com/auth/youtube",
        ],
        timeout_seconds: 30,
        authorization_timeout_seconds: 300,
        expiry_margin_seconds: 60,
        default_lifetime_seconds: 3300,
    },
    upload: UploadConfig {
        max_file_size: 256 * 1024 * BYTES_PER_MB,
        chunk_size: 32 * BYTES_PER_MB,
        attempt_timeout_seconds: 1800,
        supported_formats: &[
            "mp4", "mov", "avi", "mkv", "webm", "flv", "3gp", "mpeg", "mpg", "wmv",
        ],
        daily_upload_budget: 6,
        watch_url_prefix: "https://www.youtube.com/watch?v=",
        poll_interval_seconds: 10,
        max_wait_seconds: 600,
        max_thumbnail_size: 2 * BYTES_PER_MB,
        thumbnail_formats: &["jpg", "jpeg", "png"],
    },
    logging: LoggingConfig {
        default_filter: "warn",
        verbose_filter: "tubeyeet=debug,info",
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_is_multiple_of_256k() {
        // resumable upload の仕様上、最終チャンク以外は256KiBの倍数でなければならない
        assert_eq!(APP_CONFIG.upload.chunk_size % (256 * 1024), 0);
    }

    #[test]
    fn test_endpoints() {
        assert!(APP_CONFIG.api.endpoint.starts_with("https://"));
        assert!(APP_CONFIG.api.upload_endpoint.contains("/upload/"));
        assert!(APP_CONFIG.api.timeout_seconds > 0);
        assert!(
            APP_CONFIG
                .oauth
                .scopes
                .iter()
                .any(|scope| scope.ends_with("youtube.upload"))
        );
    }
}
