/// ドメインサービス: 表示用フォーマット
///
/// 時刻をユーザー設定のタイムゾーンオフセットで表示したり、
/// バイト数を人間向けの単位に変換したりする。
use crate::config::BYTES_PER_MB;
use chrono::{DateTime, FixedOffset, Utc};

/// UTC時刻をユーザー設定のオフセットでフォーマット
///
/// # 引数
/// * `datetime` - UTC時刻
/// * `offset_seconds` - UTCからのオフセット（秒）。例: JST=32400
///
/// # 戻り値
/// - オフセット0: "2024-12-01 14:30:45 UTC"
/// - それ以外:   "2024-12-01 23:30:45 +09:00"
///
/// 範囲外のオフセットはUTCとして扱う。
pub fn format_timestamp(datetime: DateTime<Utc>, offset_seconds: i32) -> String {
    if offset_seconds == 0 {
        return datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    }

    match FixedOffset::east_opt(offset_seconds) {
        Some(offset) => datetime
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        None => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

/// バイト数をMB表記にする
pub fn format_size(bytes: u64) -> String {
    format!("{} bytes ({:.2} MB)", bytes, bytes as f64 / BYTES_PER_MB as f64)
}
