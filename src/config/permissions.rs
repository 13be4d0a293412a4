/// シークレットファイルのパーミッション管理
///
/// リフレッシュトークンを含むファイルは所有者のみが読み書きできるようにします。
///
/// Unix系 (Linux, macOS): 0600 (rw-------)
/// Windows: ユーザープロファイル配下の既定ACLに任せる
use crate::config::error::ConfigError;
use std::fs;
use std::io::Write;
use std::path::Path;

/// シークレットを書き込む
///
/// 親ディレクトリを作成し、Unixでは作成時点から 0600 でファイルを開きます。
/// 既存ファイルを上書きする場合もパーミッションを付け直します。
pub fn write_secret_file(file_path: &Path, content: &str) -> Result<(), ConfigError> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ConfigError::file_system(
                format!("Failed to create directory: {}", parent.display()),
                e,
            )
        })?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(file_path).map_err(|e| {
        ConfigError::file_system(
            format!("Failed to open secret file: {}", file_path.display()),
            e,
        )
    })?;
    file.write_all(content.as_bytes()).map_err(|e| {
        ConfigError::file_system(
            format!("Failed to write secret file: {}", file_path.display()),
            e,
        )
    })?;

    restrict_to_owner(file_path)
}

/// 既存ファイルを所有者のみアクセス可能にする
///
/// # Errors
/// ファイルが存在しない場合、またはパーミッション設定に失敗した場合
pub fn restrict_to_owner(file_path: &Path) -> Result<(), ConfigError> {
    if !file_path.exists() {
        return Err(ConfigError::file_system(
            format!("Secret file not found: {}", file_path.display()),
            std::io::Error::new(std::io::ErrorKind::NotFound, "File does not exist"),
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(file_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            ConfigError::file_system(
                format!(
                    "Failed to set permissions (0600) for secret file: {}",
                    file_path.display()
                ),
                e,
            )
        })
    }

    #[cfg(not(unix))]
    {
        Ok(())
    }
}
