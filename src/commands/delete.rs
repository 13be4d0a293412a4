use crate::commands::result::{CommandResult, DeleteResult};
use crate::commands::connect;
use crate::config::UserConfig;
use crate::domain::DomainError;
use crate::presentation::input;
use anyhow::{Context, Result};

/// 削除コマンドを実行する
///
/// `--force` がなければ確認してから削除する。確認は認証より前に行う。
/// `--machine` では確認できないため `--force` が必須。
pub async fn execute(video_id: &str, force: bool, machine_output: bool) -> Result<CommandResult> {
    let user_config = UserConfig::load()
        .context("Failed to load user configuration. Please check your config.toml file.")?;

    if !force {
        // 機械向けモードでは対話しない
        if machine_output {
            return Err(DomainError::invalid_argument(
                "--force",
                "is required with --machine (no confirmation prompt in machine mode)",
            )
            .into());
        }

        let prompt = format!("Delete video {} from YouTube? This cannot be undone.", video_id);
        if !input::confirm(&prompt).context("Failed to read confirmation")? {
            tracing::info!(video_id, "deletion cancelled");
            return Ok(CommandResult::Delete(DeleteResult {
                video_id: video_id.to_string(),
                deleted: false,
            }));
        }
    }

    let (session, client) = connect(&user_config, None).await?;
    client
        .delete(&session, video_id)
        .await
        .with_context(|| format!("Failed to delete video {}", video_id))?;

    Ok(CommandResult::Delete(DeleteResult {
        video_id: video_id.to_string(),
        deleted: true,
    }))
}
