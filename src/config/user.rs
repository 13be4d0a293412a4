/// ユーザー設定モジュール
///
/// 実行時にユーザーディレクトリから読み込まれる動的設定を管理します。
/// Windows: C:\Users\<User>\AppData\Roaming\tubeyeet\config.toml
/// macOS:   /Users/<User>/Library/Application Support/tubeyeet/config.toml
/// Linux:   /home/<user>/.config/tubeyeet/config.toml
///
/// 初回起動時にデフォルト値から自動的にconfig.tomlを作成します。
use crate::config::APP_CONFIG;
use crate::config::error::ConfigError;
use crate::domain::metadata::{DEFAULT_CATEGORY_ID, PrivacyStatus};
use crate::domain::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};
use crate::domain::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// アプリケーションディレクトリ名
pub const APP_DIR_NAME: &str = "tubeyeet";

/// デフォルトのタイムゾーンオフセット（UTC）
const DEFAULT_TIMEZONE_OFFSET: i32 = 0;

/// タイムゾーンオフセットの最大値（+18時間 = 64800秒）
const MAX_TIMEZONE_OFFSET: i32 = 64800;

/// タイムゾーンオフセットの最小値（-18時間 = -64800秒）
const MIN_TIMEZONE_OFFSET: i32 = -64800;

/// 既定の出力ディレクトリ
const DEFAULT_OUTPUT_DIR: &str = "./output";

/// アップロード時の既定値
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadDefaults {
    /// --privacy 未指定時の公開設定
    pub privacy_status: PrivacyStatus,

    /// YouTubeカテゴリID
    pub category_id: String,

    /// 常に付与するタグ
    pub default_tags: Vec<String>,

    /// 試行回数の上限（初回を含む）
    pub max_attempts: u32,

    /// バックオフの初期待機時間(ミリ秒)
    pub base_delay_ms: u64,

    /// バックオフの最大待機時間(ミリ秒)
    pub max_delay_ms: u64,

    /// 1回の試行のタイムアウト(秒)
    pub attempt_timeout_seconds: u64,
}

impl Default for UploadDefaults {
    fn default() -> Self {
        Self {
            privacy_status: PrivacyStatus::Private,
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            default_tags: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            attempt_timeout_seconds: APP_CONFIG.upload.attempt_timeout_seconds,
        }
    }
}

/// 外部パイプライン（動画生成）の設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 動画を生成する外部コマンド（空なら実行しない）
    /// 例: ["python", "main.py", "--no-upload"]
    pub render_command: Vec<String>,
}

/// ユーザー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// タイムゾーンオフセット(秒単位)
    /// 例: UTC=0, JST(UTC+9)=32400, PST(UTC-8)=-28800
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset_seconds: i32,

    /// 生成された動画とアップロード履歴の保存先
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub upload: UploadDefaults,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

// プライベート関数（serde用）
fn default_timezone_offset() -> i32 {
    DEFAULT_TIMEZONE_OFFSET
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            timezone_offset_seconds: DEFAULT_TIMEZONE_OFFSET,
            output_dir: default_output_dir(),
            upload: UploadDefaults::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl UserConfig {
    /// アプリケーションの設定ディレクトリを取得
    ///
    /// # Errors
    /// ホームディレクトリが取得できない場合に ConfigError::DirectoryNotFound を返します。
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .ok_or_else(|| ConfigError::directory_not_found("Failed to get user config directory"))
            .map(|config_dir| config_dir.join(APP_DIR_NAME))
    }

    /// ユーザー設定ファイルのパスを取得
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// ユーザー設定を読み込む
    ///
    /// 設定ファイルが存在しない場合は、デフォルトテンプレートから自動的に作成します。
    /// 読み込み後、自動的に検証を実行します（Fail Fast）。
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスからユーザー設定を読み込む
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to read config file: {}", config_path.display()),
                e,
            )
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ConfigError::parse_error(
                format!("Failed to parse config file ({})", config_path.display()),
                e,
            )
        })?;

        // 自動検証（Fail Fast）
        config.validate()?;

        Ok(config)
    }

    /// デフォルト設定ファイルを作成
    fn create_default_config(config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::file_system(
                    format!("Failed to create config directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        fs::write(config_path, Self::default_toml_content()).map_err(|e| {
            ConfigError::file_system(
                format!(
                    "Failed to create default config file: {}",
                    config_path.display()
                ),
                e,
            )
        })?;

        Ok(())
    }

    /// デフォルトTOML設定を生成
    ///
    /// Default の値から生成するので、Rust側のデフォルト値とテンプレートがずれない。
    fn default_toml_content() -> String {
        let defaults = UploadDefaults::default();
        format!(
            r#"# tubeyeet - User Configuration
# OAuth credentials are read from the environment (or .env / client_secrets.json).
# Run 'tubeyeet login' once to store a refresh token.

# Timezone offset in seconds
# Examples: UTC=0, JST(UTC+9)=32400, PST(UTC-8)=-28800
timezone_offset_seconds = {tz}

# Where rendered videos and the upload log live (OUTPUT_DIR overrides)
output_dir = "{output_dir}"

[upload]
# private, public or unlisted
privacy_status = "{privacy}"
category_id = "{category}"
default_tags = []
max_attempts = {attempts}
base_delay_ms = {base}
max_delay_ms = {max}
attempt_timeout_seconds = {attempt_timeout}

[pipeline]
# External command that renders the next video into output_dir, e.g.
# render_command = ["python", "main.py", "--no-upload"]
render_command = []
"#,
            tz = DEFAULT_TIMEZONE_OFFSET,
            output_dir = DEFAULT_OUTPUT_DIR,
            privacy = defaults.privacy_status,
            category = defaults.category_id,
            attempts = defaults.max_attempts,
            base = defaults.base_delay_ms,
            max = defaults.max_delay_ms,
            attempt_timeout = defaults.attempt_timeout_seconds,
        )
    }

    /// ユーザー設定を検証
    ///
    /// # 検証内容
    /// - timezone_offset_seconds: ±18時間以内
    /// - output_dir: 空でないこと
    /// - upload.category_id: 数字のみ
    /// - upload.max_attempts / delay: RetryPolicy として構築できること
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_timezone_offset(self.timezone_offset_seconds)?;

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::validation_error("output_dir cannot be empty"));
        }

        let category = &self.upload.category_id;
        if category.is_empty() || !category.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::validation_error(format!(
                "upload.category_id '{}' must be numeric",
                category
            )));
        }

        self.retry_policy()?;

        Ok(())
    }

    /// タイムゾーンオフセットを検証
    fn validate_timezone_offset(offset: i32) -> Result<(), ConfigError> {
        if !(MIN_TIMEZONE_OFFSET..=MAX_TIMEZONE_OFFSET).contains(&offset) {
            return Err(ConfigError::validation_error(format!(
                "Invalid timezone offset '{}' seconds. Must be between {} and {} (±18 hours)",
                offset, MIN_TIMEZONE_OFFSET, MAX_TIMEZONE_OFFSET
            )));
        }
        Ok(())
    }

    /// アップロード設定から再試行ポリシーを構築
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.upload.max_attempts,
            Duration::from_millis(self.upload.base_delay_ms),
            Duration::from_millis(self.upload.max_delay_ms),
        )
        .and_then(|policy| {
            policy.with_attempt_timeout(Duration::from_secs(self.upload.attempt_timeout_seconds))
        })
        .map_err(|e| ConfigError::validation_error(format!("upload: {}", e)))
    }

    /// 出力ディレクトリを解決する
    ///
    /// 優先順位: CLI引数 > OUTPUT_DIR 環境変数 > 設定ファイル
    pub fn resolve_output_dir(&self, cli_value: Option<&Path>) -> PathBuf {
        if let Some(dir) = cli_value {
            return dir.to_path_buf();
        }
        match std::env::var_os("OUTPUT_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.output_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let path = UserConfig::config_path().expect("Failed to get config path");
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_load_creates_default_if_not_exists() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("tubeyeet").join("config.toml");

        let config = UserConfig::load_from(&config_path).expect("Default config should load");

        assert!(config_path.exists(), "Config file should be created");
        assert_eq!(config, UserConfig::default());

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("timezone_offset_seconds"));
        assert!(content.contains("tubeyeet login"));
        assert!(content.contains("[upload]"));
    }

    #[test]
    fn test_written_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let mut config = UserConfig::default();
        config.timezone_offset_seconds = 32400;
        config.upload.privacy_status = PrivacyStatus::Unlisted;
        config.upload.default_tags = vec!["shorts".to_string()];
        config.pipeline.render_command = vec!["python".to_string(), "main.py".to_string()];

        fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = UserConfig::load_from(&config_path).expect("Failed to load config");

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[upload]\nprivacy_status = \"public\"\n").unwrap();

        let loaded = UserConfig::load_from(&config_path).unwrap();
        assert_eq!(loaded.upload.privacy_status, PrivacyStatus::Public);
        assert_eq!(loaded.upload.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(loaded.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn test_unknown_privacy_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "[upload]\nprivacy_status = \"friends\"\n").unwrap();

        let result = UserConfig::load_from(&config_path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_timezone() {
        let config = UserConfig {
            timezone_offset_seconds: 90000,
            ..UserConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unbounded_retries() {
        let mut config = UserConfig::default();
        config.upload.max_attempts = 0;
        match config.validate() {
            Err(ConfigError::ValidationError { message }) => {
                assert!(message.contains("max_attempts"))
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = UserConfig::default();
        config.upload.max_attempts = 3;
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_zero_attempt_timeout_is_rejected() {
        let mut config = UserConfig::default();
        config.upload.attempt_timeout_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_cli_output_dir_wins() {
        let config = UserConfig::default();
        let dir = config.resolve_output_dir(Some(Path::new("/tmp/renders")));
        assert_eq!(dir, PathBuf::from("/tmp/renders"));
    }
}
