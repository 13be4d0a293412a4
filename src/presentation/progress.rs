/// プレゼンテーション層: アップロード進捗表示DTO
///
/// ドメイン層の`UploadProgress`をUI表示に適した形式に変換します。
///
/// # 設計方針
/// - `From<&UploadProgress>`で借用による変換（所有権を奪わない）
/// - `Option<DisplayProgress>`で表示抑制を明示的に表現
/// - ヘルパー関数で各フェーズの変換ロジックを分離
use crate::domain::formatter::format_size;
use crate::domain::progress::{UploadPhase, UploadProgress};

/// 進捗表示のカテゴリ
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressCategory {
    /// ファイル検証
    Validation,
    /// アップロード中
    Upload,
    /// 一時的なエラーからの再試行待ち
    Retry,
    /// 完了
    Completed,
}

/// プレゼンテーション層用の進捗情報
#[derive(Debug, Clone)]
pub struct DisplayProgress {
    pub message: String,
    pub category: ProgressCategory,
    pub details: Option<String>,
}

impl DisplayProgress {
    pub fn new(message: String, category: ProgressCategory) -> Self {
        Self {
            message,
            category,
            details: None,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

/// # 戻り値
/// - `Some(DisplayProgress)`: 表示すべき進捗情報
/// - `None`: 表示を抑制（再試行の開始は `RetryScheduled` で既に表示済み）
impl From<&UploadProgress> for Option<DisplayProgress> {
    fn from(progress: &UploadProgress) -> Self {
        match &progress.phase {
            UploadPhase::ValidatingArtifact {
                file_name,
                size_bytes,
            } => Some(format_validating(file_name, *size_bytes)),
            UploadPhase::Attempting {
                attempt,
                max_attempts,
            } => format_attempting(*attempt, *max_attempts),
            UploadPhase::RetryScheduled {
                attempt,
                max_attempts,
                delay_ms,
                reason,
            } => Some(format_retry(*attempt, *max_attempts, *delay_ms, reason)),
            UploadPhase::Completed { remote_id } => Some(format_completed(remote_id)),
        }
    }
}

/// 進捗イベントを出力する
///
/// 機械向けは1イベント1行のJSONを stdout に、人間向けは stderr に出す。
pub fn report(progress: &UploadProgress, machine_output: bool) {
    if machine_output {
        let event = serde_json::json!({
            "type": "progress",
            "event": &progress.phase,
        });
        println!("{}", event);
        return;
    }

    if let Some(display) = Option::<DisplayProgress>::from(progress) {
        match &display.details {
            Some(details) => eprintln!("{} ({})", display.message, details),
            None => eprintln!("{}", display.message),
        }
    }
}

fn format_validating(file_name: &str, size_bytes: u64) -> DisplayProgress {
    DisplayProgress::new(
        format!("Validated {}: {}", file_name, format_size(size_bytes)),
        ProgressCategory::Validation,
    )
}

fn format_attempting(attempt: u32, max_attempts: u32) -> Option<DisplayProgress> {
    if attempt > 1 {
        return None;
    }
    Some(
        DisplayProgress::new("Uploading to YouTube...".to_string(), ProgressCategory::Upload)
            .with_details(format!("up to {} attempts", max_attempts)),
    )
}

fn format_retry(attempt: u32, max_attempts: u32, delay_ms: u64, reason: &str) -> DisplayProgress {
    DisplayProgress::new(
        format!(
            "Attempt {}/{} failed, retrying in {:.1}s",
            attempt,
            max_attempts,
            delay_ms as f64 / 1000.0
        ),
        ProgressCategory::Retry,
    )
    .with_details(reason.to_string())
}

fn format_completed(remote_id: &str) -> DisplayProgress {
    DisplayProgress::new(
        format!("Upload complete (video ID: {})", remote_id),
        ProgressCategory::Completed,
    )
}
