/// プレゼンテーション層: ユーザー入力処理
///
/// 確認プロンプトなど、stdin からの対話的な入力を扱います。
/// プロンプトは stdout を汚さないよう stderr に出します。
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// y/N の確認を求める（既定は No）
pub fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N]: ", prompt);
    io::stderr().flush()?;

    let stdin = io::stdin();
    read_confirmation(&mut stdin.lock())
}

fn read_confirmation(reader: &mut impl BufRead) -> Result<bool> {
    let mut answer = String::new();
    reader
        .read_line(&mut answer)
        .context("Failed to read answer from input")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
