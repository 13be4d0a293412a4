/// アップロード履歴
///
/// `<output_dir>/uploads/upload_log.json` に全件を追記し、
/// 動画ごとに `upload_<id>.json` も書き出す。
/// 当日のアップロード件数は1日の上限の警告に使う（YouTubeの上限はUTC 0時にリセット）。
use crate::domain::{PrivacyStatus, UploadStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const HISTORY_DIR_NAME: &str = "uploads";
const LOG_FILE_NAME: &str = "upload_log.json";

/// 1件分のアップロード記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub privacy_status: PrivacyStatus,
    pub status: UploadStatus,
    pub file_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

pub struct UploadHistory {
    dir: PathBuf,
}

impl UploadHistory {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            dir: output_dir.join(HISTORY_DIR_NAME),
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    fn record_path(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("upload_{}.json", video_id))
    }

    /// 記録を全件読み込む。ファイルが無ければ空
    pub fn load(&self) -> Result<Vec<UploadRecord>> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse upload history {}", path.display()))
    }

    /// 記録を追記し、動画ごとのファイルも書き出す
    pub fn append(&self, record: &UploadRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let record_path = self.record_path(&record.video_id);
        fs::write(&record_path, serde_json::to_string_pretty(record)?)
            .with_context(|| format!("Failed to write {}", record_path.display()))?;

        let mut records = self.load()?;
        records.push(record.clone());

        let log_path = self.log_path();
        fs::write(&log_path, serde_json::to_string_pretty(&records)?)
            .with_context(|| format!("Failed to write {}", log_path.display()))?;

        tracing::debug!(video_id = %record.video_id, total = records.len(), "upload recorded");
        Ok(())
    }

    /// `now` と同じUTC日付の記録件数
    pub fn uploads_on_day_of(&self, now: DateTime<Utc>) -> Result<usize> {
        let today = now.date_naive();
        Ok(self
            .load()?
            .iter()
            .filter(|record| record.uploaded_at.date_naive() == today)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(id: &str, uploaded_at: DateTime<Utc>) -> UploadRecord {
        UploadRecord {
            video_id: id.to_string(),
            title: format!("Video {}", id),
            url: format!("https://www.youtube.com/watch?v={}", id),
            privacy_status: PrivacyStatus::Private,
            status: UploadStatus::Processing,
            file_path: "/tmp/short.mp4".to_string(),
            tags: vec!["shorts".to_string()],
            uploaded_at,
        }
    }

    #[test]
    fn test_load_without_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let history = UploadHistory::new(temp.path());
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_writes_log_and_record_file() {
        let temp = TempDir::new().unwrap();
        let history = UploadHistory::new(temp.path());
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        history.append(&record("a1", now)).unwrap();
        history.append(&record("b2", now)).unwrap();

        let records = history.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].video_id, "b2");
        assert!(temp.path().join("uploads/upload_a1.json").exists());
        assert!(temp.path().join("uploads/upload_b2.json").exists());
    }

    #[test]
    fn test_uploads_counted_per_utc_day() {
        let temp = TempDir::new().unwrap();
        let history = UploadHistory::new(temp.path());

        let yesterday = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 5, 2, 0, 1, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 5, 2, 20, 0, 0).unwrap();

        history.append(&record("old", yesterday)).unwrap();
        history.append(&record("m", morning)).unwrap();
        history.append(&record("e", evening)).unwrap();

        assert_eq!(history.uploads_on_day_of(evening).unwrap(), 2);
        assert_eq!(history.uploads_on_day_of(yesterday).unwrap(), 1);
    }

    #[test]
    fn test_corrupted_log_is_an_error() {
        let temp = TempDir::new().unwrap();
        let history = UploadHistory::new(temp.path());
        fs::create_dir_all(temp.path().join("uploads")).unwrap();
        fs::write(history.log_path(), "not json").unwrap();

        assert!(history.load().is_err());
        let now = Utc::now();
        assert!(history.append(&record("x", now)).is_err());
    }
}
