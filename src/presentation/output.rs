/// プレゼンテーション層: コマンド結果の出力
///
/// コマンド実行結果をユーザー向け（人間可読）または
/// 機械向け（JSON）形式で出力する責務を担います。
/// 人間向けはすべて stderr、機械向けJSONは stdout に出します。
use crate::commands::result::CommandResult;
use crate::config::UserConfig;
use crate::domain::formatter::{format_size, format_timestamp};
use crate::domain::RemoteVideo;
use anyhow::Result;

/// コマンド結果を適切な形式で出力する
///
/// * `machine_output = false`: 人間向けの詳細メッセージ（stderr）
/// * `machine_output = true`: 機械可読JSON（stdout）
pub fn output_result(result: &CommandResult, machine_output: bool) -> Result<()> {
    if machine_output {
        output_machine_readable(result)
    } else {
        output_human_readable(result);
        Ok(())
    }
}

/// エラーを出力する
///
/// 機械向けモードでも stdout に1行のJSONとして出すため、
/// 呼び出し側は成功・失敗にかかわらず stdout をパースできる。
pub fn output_error(
    error: &anyhow::Error,
    exit_code: i32,
    hint: Option<&str>,
    machine_output: bool,
) {
    if machine_output {
        let causes: Vec<String> = error.chain().skip(1).map(|c| c.to_string()).collect();
        let json = serde_json::json!({
            "success": false,
            "error": {
                "message": error.to_string(),
                "causes": causes,
                "exit_code": exit_code,
                "hint": hint,
            }
        });
        println!("{}", json);
        return;
    }

    eprintln!("Error: {}", error);

    let chain: Vec<_> = error.chain().skip(1).collect();
    if !chain.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            eprintln!("  {}: {}", i + 1, cause);
        }
    }

    if let Some(hint) = hint {
        eprintln!("\nHint: {}", hint);
    }
}

fn output_human_readable(result: &CommandResult) {
    match result {
        CommandResult::Login(r) => {
            eprintln!();
            if r.was_logged_in {
                eprintln!("Login credentials updated!");
            } else {
                eprintln!("Login successful.");
            }
            eprintln!("Refresh token saved to: {}", r.token_path);
            eprintln!("Session valid until: {}", format_user_time(r.expires_at));
        }
        CommandResult::Logout(r) => {
            if r.was_logged_in {
                eprintln!("Logged out successfully.");
                eprintln!("The saved refresh token has been removed.");
            } else {
                eprintln!("Already logged out.");
            }
        }
        CommandResult::Upload(r) => {
            if !r.uploaded {
                eprintln!("\nVideo ready (upload skipped with --no-upload)");
            } else {
                eprintln!("\nUpload completed successfully!");
            }
            eprintln!("---");
            if let Some(video_id) = &r.video_id {
                eprintln!("Video ID: {}", video_id);
            }
            if let Some(url) = &r.url {
                eprintln!("URL:      {}", url);
            }
            if let Some(status) = &r.status {
                eprintln!("Status:   {}", status);
            }
            eprintln!("Title:    {}", r.title);
            eprintln!("Privacy:  {}", r.privacy_status);
            if !r.tags.is_empty() {
                eprintln!("Tags:     {}", r.tags.join(", "));
            }
            eprintln!("File:     {} ({})", r.file_path, r.source);
            eprintln!("Size:     {}", format_size(r.file_size));
            eprintln!("---");

            match r.thumbnail_set {
                Some(true) => eprintln!("Thumbnail: set"),
                Some(false) => eprintln!("Thumbnail: FAILED (see warnings above)"),
                None => {}
            }

            if let Some(count) = r.uploads_today {
                eprintln!("Uploads today (UTC): {}", count);
            }
        }
        CommandResult::Status(r) => {
            eprintln!();
            print_video(&r.video, &r.url);
        }
        CommandResult::Update(r) => {
            eprintln!();
            if r.verified {
                eprintln!("Video updated and verified.");
            } else {
                eprintln!(
                    "Video updated, but these fields did not match after re-fetching: {}",
                    r.mismatched_fields.join(", ")
                );
            }
            eprintln!();
            print_video(&r.video, &r.url);
        }
        CommandResult::Delete(r) => {
            eprintln!();
            if r.deleted {
                eprintln!("Video deleted successfully!");
                eprintln!("Video ID: {}", r.video_id);
            } else {
                eprintln!("Deletion cancelled. Video {} was not deleted.", r.video_id);
            }
        }
    }
}

fn print_video(video: &RemoteVideo, url: &str) {
    eprintln!("Video Details:");
    eprintln!("==============");
    eprintln!("Video ID:     {}", video.id);
    eprintln!("URL:          {}", url);
    eprintln!("Status:       {}", video.status);
    if let Some(reason) = &video.failure_reason {
        eprintln!("Reason:       {}", reason);
    }
    eprintln!("Title:        {}", video.title);
    match video.privacy_status {
        Some(privacy) => eprintln!("Privacy:      {}", privacy),
        None => eprintln!("Privacy:      (unknown)"),
    }
    if let Some(category) = &video.category_id {
        eprintln!("Category:     {}", category);
    }
    if !video.tags.is_empty() {
        let tags: Vec<&str> = video.tags.iter().map(String::as_str).collect();
        eprintln!("Tags:         {}", tags.join(", "));
    }
    if let Some(stats) = &video.statistics {
        eprintln!("Views:        {}", stats.view_count);
        eprintln!("Likes:        {}", optional_count(stats.like_count));
        eprintln!("Comments:     {}", optional_count(stats.comment_count));
        eprintln!("Favorites:    {}", stats.favorite_count);
    }
    if !video.description.is_empty() {
        eprintln!();
        eprintln!("{}", video.description);
    }
    eprintln!();
}

fn optional_count(count: Option<u64>) -> String {
    count.map_or_else(|| "(hidden)".to_string(), |n| n.to_string())
}

/// ユーザー設定のタイムゾーンで時刻を表示する（設定が読めなければUTC）
fn format_user_time(time: chrono::DateTime<chrono::Utc>) -> String {
    let offset = UserConfig::load()
        .map(|config| config.timezone_offset_seconds)
        .unwrap_or(0);
    format_timestamp(time, offset)
}

/// 機械可読JSONを出力（stdout）
fn output_machine_readable(result: &CommandResult) -> Result<()> {
    let json = match result {
        CommandResult::Login(r) => serde_json::json!({
            "success": true,
            "command": "login",
            "was_logged_in": r.was_logged_in,
            "action": if r.was_logged_in { "updated" } else { "created" },
            "origin": r.origin,
            "expires_at": r.expires_at,
            "token_path": r.token_path,
        }),
        CommandResult::Logout(r) => serde_json::json!({
            "success": true,
            "command": "logout",
            "was_logged_in": r.was_logged_in,
        }),
        CommandResult::Upload(r) => serde_json::json!({
            "success": true,
            "command": "upload",
            "uploaded": r.uploaded,
            "video_id": r.video_id,
            "url": r.url,
            "status": r.status,
            "title": r.title,
            "privacy_status": r.privacy_status,
            "tags": r.tags,
            "file_path": r.file_path,
            "file_size": r.file_size,
            "file_format": r.file_format,
            "source": r.source,
            "uploads_today": r.uploads_today,
            "thumbnail_set": r.thumbnail_set,
        }),
        CommandResult::Status(r) => serde_json::json!({
            "success": true,
            "command": "status",
            "url": r.url,
            "video": r.video,
        }),
        CommandResult::Update(r) => serde_json::json!({
            "success": true,
            "command": "update",
            "url": r.url,
            "verified": r.verified,
            "mismatched_fields": r.mismatched_fields,
            "video": r.video,
        }),
        CommandResult::Delete(r) => serde_json::json!({
            "success": true,
            "command": "delete",
            "video_id": r.video_id,
            "deleted": r.deleted,
        }),
    };

    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::result::{DeleteResult, LogoutResult, StatusResult, UploadResult};
    use crate::domain::{PrivacyStatus, UploadStatus, VideoStatistics};
    use std::collections::BTreeSet;

    fn upload_result(uploaded: bool) -> CommandResult {
        CommandResult::Upload(UploadResult {
            uploaded,
            video_id: uploaded.then(|| "abc".to_string()),
            url: uploaded.then(|| "https://www.youtube.com/watch?v=abc".to_string()),
            status: uploaded.then_some(UploadStatus::Processing),
            title: "Title".to_string(),
            privacy_status: PrivacyStatus::Private,
            tags: vec!["shorts".to_string()],
            file_path: "/out/short.mp4".to_string(),
            file_size: 10_485_760,
            file_format: "mp4".to_string(),
            source: "explicit".to_string(),
            uploads_today: Some(1),
            thumbnail_set: uploaded.then_some(true),
        })
    }

    #[test]
    fn test_output_machine_readable_upload() {
        assert!(output_machine_readable(&upload_result(true)).is_ok());
        assert!(output_machine_readable(&upload_result(false)).is_ok());
    }

    #[test]
    fn test_output_machine_readable_status() {
        let result = CommandResult::Status(StatusResult {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            video: RemoteVideo {
                id: "abc".to_string(),
                title: "Title".to_string(),
                description: String::new(),
                tags: BTreeSet::new(),
                privacy_status: None,
                category_id: None,
                status: UploadStatus::Failed,
                failure_reason: Some("duplicate".to_string()),
                statistics: Some(VideoStatistics {
                    view_count: 12,
                    like_count: None,
                    comment_count: Some(1),
                    favorite_count: 0,
                }),
            },
        });

        assert!(output_result(&result, true).is_ok());
        assert!(output_result(&result, false).is_ok());
    }

    #[test]
    fn test_output_human_readable_logout_and_delete() {
        let results = [
            CommandResult::Logout(LogoutResult {
                was_logged_in: true,
            }),
            CommandResult::Delete(DeleteResult {
                video_id: "abc".to_string(),
                deleted: false,
            }),
            upload_result(false),
        ];
        for result in &results {
            assert!(output_result(result, false).is_ok());
        }
    }

    #[test]
    fn test_output_error_both_modes() {
        let error = anyhow::anyhow!("root cause").context("Upload command failed");
        output_error(&error, 4, Some("Try again later"), true);
        output_error(&error, 4, None, false);
    }
}
