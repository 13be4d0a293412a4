/// ログ出力の初期化
///
/// stdout は `--machine` のJSON出力に予約されているため、ログは常に stderr へ出す。
/// `RUST_LOG` が設定されていればそれを優先する。
use crate::config::APP_CONFIG;
use tracing_subscriber::EnvFilter;

/// 既定のフィルタ文字列を選ぶ
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        APP_CONFIG.logging.verbose_filter
    } else {
        APP_CONFIG.logging.default_filter
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // 二重初期化（テストなど）は無視する
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
