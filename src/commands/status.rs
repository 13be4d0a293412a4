use crate::api::UploadClient;
use crate::commands::result::{CommandResult, StatusResult};
use crate::commands::{connect, watch_url};
use crate::config::{APP_CONFIG, UserConfig};
use crate::domain::{Session, UploadStatus};
use anyhow::{Context, Result};
use std::time::Duration;

/// ステータスコマンドを実行する
///
/// アップロード済み動画の処理状況とメタデータを取得する（読み取りのみ）。
/// `--wait` の場合は処理が終わるまで一定間隔で状態を確認する。
pub async fn execute(video_id: &str, wait: bool) -> Result<CommandResult> {
    let user_config = UserConfig::load()
        .context("Failed to load user configuration. Please check your config.toml file.")?;

    let (session, client) = connect(&user_config, None).await?;

    if wait {
        let status = wait_for_processing(
            &client,
            &session,
            video_id,
            Duration::from_secs(APP_CONFIG.upload.poll_interval_seconds),
            Duration::from_secs(APP_CONFIG.upload.max_wait_seconds),
        )
        .await?;
        tracing::info!(video_id, %status, "processing finished");
    }

    let video = client
        .get_video(&session, video_id)
        .await
        .with_context(|| format!("Failed to fetch video {}", video_id))?;

    Ok(CommandResult::Status(StatusResult {
        url: watch_url(&video.id),
        video,
    }))
}

/// `processing` 以外になるまで状態を確認する
///
/// 最大待機時間を過ぎても処理中なら、その時点の状態（processing）を返す。
async fn wait_for_processing(
    client: &UploadClient,
    session: &Session,
    video_id: &str,
    interval: Duration,
    max_wait: Duration,
) -> Result<UploadStatus> {
    let started = tokio::time::Instant::now();

    loop {
        let status = client
            .get_status(session, video_id)
            .await
            .with_context(|| format!("Failed to check status of video {}", video_id))?;

        if status != UploadStatus::Processing {
            return Ok(status);
        }

        let elapsed = started.elapsed();
        if elapsed >= max_wait {
            tracing::warn!(
                video_id,
                waited_secs = elapsed.as_secs(),
                "video is still processing, giving up waiting"
            );
            return Ok(status);
        }

        eprintln!("Still processing... ({}s elapsed)", elapsed.as_secs());
        tokio::time::sleep(interval).await;
    }
}
