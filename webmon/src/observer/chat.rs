//! チャットWebhookシンク
//!
//! 失敗時に、`payload=<JSON>`形式のフォームボディをWebhook URLへPOSTする。

use super::{trouble_subject, Observer};
use crate::config::ChatConfig;
use crate::error::ObserverError;
use crate::monitor::FailureDetail;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// チャットへ失敗を通知するオブザーバー
pub struct ChatObserver {
    webhook_url: String,
    channel: String,
    client: Client,
}

impl ChatObserver {
    /// 新しいシンクを作成
    pub fn new(webhook_url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            channel: channel.into(),
            client: Client::new(),
        }
    }

    /// 設定からシンクを作成
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(&config.webhook_url, &config.channel)
    }

    /// メッセージを送信
    pub async fn send(&self, text: &str) -> Result<(), ObserverError> {
        let body = encode_payload(&self.channel, text)?;
        self.client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Webhookへ送るJSON本体
#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    channel: &'a str,
    text: &'a str,
}

/// `payload`フィールドにJSONを格納したURLエンコード済みフォームボディ
pub fn encode_payload(channel: &str, text: &str) -> Result<String, ObserverError> {
    let payload = serde_json::to_string(&ChatPayload { channel, text })
        .map_err(|e| ObserverError::Payload(e.to_string()))?;
    Ok(serde_urlencoded::to_string([("payload", payload)])?)
}

/// 失敗内容から通知メッセージを作る
pub(crate) fn failure_message(url: &str, detail: &FailureDetail) -> String {
    match detail {
        FailureDetail::Status(code) => {
            format!("{}. GET returned {}", trouble_subject(url), code)
        }
        FailureDetail::Transport(message) => format!("{}: {}", trouble_subject(url), message),
    }
}

#[async_trait]
impl Observer for ChatObserver {
    fn name(&self) -> &str {
        "chat"
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        self.send(&failure_message(url, detail)).await?;
        info!(url = %url, channel = %self.channel, "Failure posted to chat");
        Ok(())
    }
}
