//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables and the typed
//! sink configuration built from CLI arguments (which themselves fall back to
//! `WEBMON_*` environment variables).

use crate::cli::Cli;
use crate::error::{WatchError, WatchResult};
use crate::observer::store::DEFAULT_DB_PATH;
use std::path::PathBuf;
use std::time::Duration;

/// Default SMTP submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Get an environment variable, treating empty values as unset
///
/// # Example
/// ```
/// use webmon::config::get_env;
///
/// let level = get_env("WEBMON_LOG_LEVEL");
/// ```
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable or a default value
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 永続化シンクの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLiteファイルのパス
    pub path: PathBuf,
}

/// メールシンクの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    /// SMTPリレーのホスト名
    pub host: String,
    /// SMTPリレーのポート
    pub port: u16,
    /// 送信元アドレス
    pub from: String,
    /// 宛先アドレス
    pub to: Vec<String>,
    /// SMTP認証のログイン名
    pub login: Option<String>,
    /// SMTP認証のパスワード
    pub password: Option<String>,
}

/// チャットシンクの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Webhook URL
    pub webhook_url: String,
    /// 投稿先チャンネル
    pub channel: String,
}

/// 有効なシンクの設定一式
///
/// 各Monitorにはこの設定から専用のオブザーバーが作られる。
/// 登録順は console → store → mail → chat。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// コンソール出力を行うか
    pub console: bool,
    /// 永続化シンク（無効ならNone）
    pub store: Option<StoreConfig>,
    /// メールシンク（未設定ならNone）
    pub mail: Option<MailConfig>,
    /// チャットシンク（未設定ならNone）
    pub chat: Option<ChatConfig>,
}

/// 監視プロセス全体の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// 監視対象URL（1件以上）
    pub urls: Vec<String>,
    /// チェック間隔
    pub interval: Duration,
    /// 詳細ログ
    pub verbose: bool,
    /// シンク設定
    pub sinks: SinkConfig,
}

impl WatchConfig {
    /// パース済みのCLI引数から設定を組み立てる
    ///
    /// シンクの指定が不完全・不正な場合は[`WatchError::Config`]を返す。
    pub fn from_cli(cli: &Cli) -> WatchResult<Self> {
        Ok(Self {
            urls: cli.urls.clone(),
            interval: Duration::from_secs(cli.repeat),
            verbose: cli.verbose,
            sinks: SinkConfig::from_cli(cli)?,
        })
    }
}

impl SinkConfig {
    /// CLI引数からシンク設定を組み立てる
    pub fn from_cli(cli: &Cli) -> WatchResult<Self> {
        let store = (!cli.no_db).then(|| StoreConfig {
            path: cli
                .db
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        });

        Ok(Self {
            console: !cli.quiet,
            store,
            mail: mail_config(cli)?,
            chat: chat_config(cli)?,
        })
    }
}

impl MailConfig {
    /// ログイン名とパスワードが両方そろっている場合のみ認証情報を返す
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.login, &self.password) {
            (Some(login), Some(password)) => Some((login.clone(), password.clone())),
            _ => None,
        }
    }
}

/// SMTPサーバー指定（`host` または `host:port`）を分解する
pub fn parse_smtp_server(value: &str) -> WatchResult<(String, u16)> {
    let invalid = || WatchError::Config(format!("invalid SMTP server '{}'", value));
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    match trimmed.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().map_err(|_| invalid())?;
            Ok((host.to_string(), port))
        }
        Some(_) => Err(invalid()),
        None => Ok((trimmed.to_string(), DEFAULT_SMTP_PORT)),
    }
}

fn mail_config(cli: &Cli) -> WatchResult<Option<MailConfig>> {
    let to: Vec<String> = cli.mail_to.iter().flat_map(|v| split_list(v)).collect();
    let (server, from) = match (&cli.smtp_server, &cli.mail_from, to.is_empty()) {
        (None, None, true) => return Ok(None),
        (Some(server), Some(from), false) => (server, from),
        _ => {
            return Err(WatchError::Config(
                "mail notifications need --smtp-server, --mail-from and --mail-to".to_string(),
            ))
        }
    };

    let (host, port) = parse_smtp_server(server)?;
    Ok(Some(MailConfig {
        host,
        port,
        from: from.clone(),
        to,
        login: get_env("WEBMON_SMTP_LOGIN"),
        password: get_env("WEBMON_SMTP_PASSWORD"),
    }))
}

fn chat_config(cli: &Cli) -> WatchResult<Option<ChatConfig>> {
    match (&cli.chat_webhook, &cli.chat_channel) {
        (None, None) => Ok(None),
        (Some(webhook_url), Some(channel)) => Ok(Some(ChatConfig {
            webhook_url: webhook_url.clone(),
            channel: channel.clone(),
        })),
        _ => Err(WatchError::Config(
            "chat notifications need both --chat-webhook and --chat-channel".to_string(),
        )),
    }
}
