/// アップロード対象の動画を用意する
///
/// 動画の生成自体（台本・音声・映像合成）は外部コマンドの担当で、
/// ここでは「どのファイルをアップロードするか」だけを決める。
///
/// 優先順位:
/// 1. CLIで明示されたパス
/// 2. `pipeline.render_command` が設定されていれば実行し、その出力
/// 3. 出力ディレクトリ内で最も新しい、まだアップロードしていない動画
use crate::domain::artifact::is_supported_video;
use crate::domain::{DomainError, MediaArtifact};
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};
use tokio::process::Command;

/// ファイルシステムの mtime は粗い時計で記録されるため、開始時刻から少し遡って比較する
const MTIME_TOLERANCE: Duration = Duration::from_secs(2);

/// アップロード対象の取得元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Explicit(PathBuf),
    Render {
        command: Vec<String>,
        output_dir: PathBuf,
    },
    Latest {
        output_dir: PathBuf,
    },
}

impl ArtifactSource {
    pub fn choose(explicit: Option<&Path>, render_command: &[String], output_dir: &Path) -> Self {
        if let Some(path) = explicit {
            return Self::Explicit(path.to_path_buf());
        }
        if render_command.is_empty() {
            Self::Latest {
                output_dir: output_dir.to_path_buf(),
            }
        } else {
            Self::Render {
                command: render_command.to_vec(),
                output_dir: output_dir.to_path_buf(),
            }
        }
    }

    /// 結果表示用の短い名前
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::Render { .. } => "render",
            Self::Latest { .. } => "latest",
        }
    }
}

/// 取得元からアーティファクトを解決し、検証する
///
/// `uploaded` は履歴に記録済みのパス。`Latest` ではこれらを候補から外す。
/// 生成コマンドの出力は実行後の mtime で絞るため対象外。
pub async fn resolve(source: &ArtifactSource, uploaded: &HashSet<PathBuf>) -> Result<MediaArtifact> {
    let path = match source {
        ArtifactSource::Explicit(path) => path.clone(),
        ArtifactSource::Render {
            command,
            output_dir,
        } => {
            let started = SystemTime::now();
            run_render(command, output_dir).await?;
            let not_before = started.checked_sub(MTIME_TOLERANCE).unwrap_or(started);
            scan(output_dir, Some(not_before), HashSet::new())
                .await?
                .ok_or_else(|| {
                    DomainError::artifact_not_found(
                        output_dir.display().to_string(),
                        "render command finished but produced no supported video",
                    )
                })?
        }
        ArtifactSource::Latest { output_dir } => scan(output_dir, None, uploaded.clone())
            .await?
            .ok_or_else(|| {
                let reason = if uploaded.is_empty() {
                    "no supported video found in output directory"
                } else {
                    "no new video (all candidates already uploaded)"
                };
                DomainError::artifact_not_found(output_dir.display().to_string(), reason)
            })?,
    };

    tracing::info!(path = %path.display(), source = source.kind(), "artifact selected");
    Ok(MediaArtifact::from_path(&path)?)
}

/// 外部の生成コマンドを実行する
///
/// 出力先は `OUTPUT_DIR` 環境変数で渡す。子プロセスの stdout は
/// `--machine` の出力を汚さないよう stderr に流す。
async fn run_render(command: &[String], output_dir: &Path) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("pipeline.render_command is empty");
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    tracing::info!(program = %program, "running render command");
    let status = Command::new(program)
        .args(args)
        .env("OUTPUT_DIR", output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(io::stderr()))
        .status()
        .await
        .with_context(|| format!("Failed to execute render command '{}'", program))?;

    if !status.success() {
        bail!("Render command '{}' failed with {}", program, status);
    }
    Ok(())
}

/// `newest_video` をブロッキング用スレッドで実行する
async fn scan(
    dir: &Path,
    not_before: Option<SystemTime>,
    excluded: HashSet<PathBuf>,
) -> Result<Option<PathBuf>> {
    let owned = dir.to_path_buf();
    tokio::task::spawn_blocking(move || newest_video(&owned, not_before, &excluded))
        .await
        .context("Directory scan task panicked")?
        .with_context(|| format!("Failed to scan {}", dir.display()))
}

/// ディレクトリ以下（再帰）で最も新しい動画ファイルを探す
///
/// `excluded` に含まれるパスは飛ばす。ディレクトリが存在しない場合は `None`。
pub fn newest_video(
    dir: &Path,
    not_before: Option<SystemTime>,
    excluded: &HashSet<PathBuf>,
) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() || !is_supported_video(&path) || excluded.contains(&path) {
                continue;
            }

            let modified = entry.metadata()?.modified()?;
            if not_before.is_some_and(|limit| modified < limit) {
                continue;
            }
            if newest.as_ref().is_none_or(|(best, _)| modified > *best) {
                newest = Some((modified, path));
            }
        }
    }

    Ok(newest.map(|(_, path)| path))
}
