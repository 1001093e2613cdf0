//! ロギング初期化ユーティリティ
//!
//! tracing-subscriberのfmtレイヤーを標準エラー出力へ向けて設定する。
//! 標準出力はコンソールシンクの結果行専用。

use crate::config::{get_env, get_env_or};
use tracing_subscriber::EnvFilter;

/// ログフィルタを指定する環境変数
pub const LOG_LEVEL_ENV: &str = "WEBMON_LOG_LEVEL";

/// フィルタ文字列を決定する
///
/// 優先順位: `WEBMON_LOG_LEVEL` → `RUST_LOG` → `-v`指定時は`debug` → `info`
pub fn filter_directive(verbose: bool) -> String {
    let fallback = if verbose { "debug" } else { "info" };
    get_env(LOG_LEVEL_ENV).unwrap_or_else(|| get_env_or("RUST_LOG", fallback))
}

/// グローバルサブスクライバーを初期化
///
/// 2回目以降の呼び出しはエラーを返す。
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directive = filter_directive(verbose);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|e| format!("invalid log filter '{}': {}", directive, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}
