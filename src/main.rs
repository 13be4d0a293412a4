mod api;
mod cli;
mod commands;
mod config;
mod domain;
mod error_severity;
mod history;
mod logging;
mod pipeline;
mod presentation;

use api::error::{ClientError, InfraError};
use clap::Parser;
use config::error::ConfigError;
use domain::error::DomainError;
use error_severity::ErrorSeverity;

#[tokio::main]
async fn main() {
    // .env は任意（CIでは環境変数が直接渡される）
    let dotenv = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    logging::init(cli.verbose);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let machine = cli.machine;
    let outcome = match cli::run(cli.command, machine).await {
        Ok(result) => presentation::output::output_result(&result, machine),
        Err(e) => Err(e),
    };

    if let Err(e) = outcome {
        handle_error(e, machine);
    }
}

/// エラーハンドリングとユーザーへの表示
///
/// anyhow::Error から元のエラー型を downcast して、
/// エラーの種類に応じた exit code とヒントを決定する。
fn handle_error(error: anyhow::Error, machine: bool) -> ! {
    match find_severity(&error) {
        Some(severity) => tracing::debug!(error = ?error, severity = %severity, "command failed"),
        None => tracing::debug!(error = ?error, "command failed with an untyped error"),
    }

    let exit_code = determine_exit_code(&error);
    let hint = get_error_hint(&error);
    presentation::output::output_error(&error, exit_code, hint.as_deref(), machine);

    std::process::exit(exit_code);
}

/// エラーチェーンから最初に見つかった型付きエラーの深刻度
fn find_severity(error: &anyhow::Error) -> Option<ErrorSeverity> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ClientError>() {
            Some(e.severity())
        } else if let Some(e) = cause.downcast_ref::<DomainError>() {
            Some(e.severity())
        } else if let Some(e) = cause.downcast_ref::<InfraError>() {
            Some(e.severity())
        } else {
            cause.downcast_ref::<ConfigError>().map(ConfigError::severity)
        }
    })
}

/// エラーチェーンから適切な終了コードを決定
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    // 不明なエラーはユーザーエラー扱い
    find_severity(error)
        .unwrap_or(ErrorSeverity::UserError)
        .exit_code()
}

/// エラーに対するユーザー向けヒントを取得
fn get_error_hint(error: &anyhow::Error) -> Option<String> {
    error.chain().find_map(|cause| {
        let hint = if let Some(e) = cause.downcast_ref::<ClientError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<DomainError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<InfraError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<ConfigError>() {
            e.hint()
        } else {
            None
        };
        hint.map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::time::Duration;

    fn wrap<E>(error: E) -> anyhow::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Err::<(), E>(error)
            .context("inner step failed")
            .context("Upload command failed")
            .unwrap_err()
    }

    #[test]
    fn test_exit_code_for_domain_error() {
        let error = wrap(DomainError::invalid_metadata("title must not be empty"));
        assert_eq!(determine_exit_code(&error), 1);
        assert!(get_error_hint(&error).is_some());
    }

    #[test]
    fn test_exit_code_for_missing_credentials() {
        let error = wrap(ClientError::from(DomainError::missing_credentials("client_id")));
        assert_eq!(determine_exit_code(&error), 2);
    }

    #[test]
    fn test_exit_code_for_exhausted_retries() {
        let last = InfraError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(1)),
        };
        let error = wrap(ClientError::from(InfraError::exhausted("upload", 4, last)));
        assert_eq!(determine_exit_code(&error), 4);
    }

    #[test]
    fn test_exit_code_for_fatal_remote_error() {
        let error = wrap(InfraError::network("connection reset"));
        assert_eq!(determine_exit_code(&error), 3);
    }

    #[test]
    fn test_unknown_error_defaults_to_user_error() {
        let error = anyhow::anyhow!("something else");
        assert_eq!(determine_exit_code(&error), 1);
        assert_eq!(get_error_hint(&error), None);
    }
}
