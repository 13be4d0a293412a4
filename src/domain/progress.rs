use serde::Serialize;
/// ドメイン層: アップロード進捗イベント定義
///
/// アップロード処理の各段階をイベントとして表現します。
/// プレゼンテーション層はこれらのイベントを受け取り、
/// 人間向けの進捗表示や機械向けのJSON出力に使用します。
use std::time::SystemTime;

/// アップロード処理の各段階を表すイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum UploadPhase {
    /// アーティファクト再検証
    ValidatingArtifact { file_name: String, size_bytes: u64 },

    /// 試行開始
    Attempting { attempt: u32, max_attempts: u32 },

    /// 一時的なエラーによる再試行の予約
    RetryScheduled {
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        reason: String,
    },

    /// アップロード処理完了
    Completed { remote_id: String },
}

/// アップロード進捗情報
#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    /// 処理段階
    pub phase: UploadPhase,
    #[serde(skip)]
    #[allow(dead_code)]
    pub timestamp: SystemTime,
}

impl UploadProgress {
    /// 新しい進捗情報を作成
    pub fn new(phase: UploadPhase) -> Self {
        Self {
            phase,
            timestamp: SystemTime::now(),
        }
    }
}
