//! メール通知シンク
//!
//! 失敗時に、STARTTLS + 認証付きSMTPでプレーンテキストのメールを送信する。

use super::{trouble_subject, Observer};
use crate::config::MailConfig;
use crate::error::ObserverError;
use crate::monitor::FailureDetail;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

/// メール送信経路
///
/// 本番ではSMTPリレー、テストでは送信内容を記録する実装を差し込む。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 組み立て済みのメッセージを送信
    async fn send(&self, message: Message) -> Result<(), ObserverError>;
}

/// STARTTLSで接続するSMTPリレー
pub struct SmtpRelay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    /// STARTTLSリレーを作成（認証情報があればAUTHを行う）
    pub fn starttls(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
    ) -> Result<Self, ObserverError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port);
        if let Some((login, password)) = credentials {
            builder = builder.credentials(Credentials::new(login, password));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn send(&self, message: Message) -> Result<(), ObserverError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

/// 失敗をメールで通知するオブザーバー
pub struct MailObserver {
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: Box<dyn MailTransport>,
}

impl MailObserver {
    /// 設定からSMTPリレー経由のシンクを作成
    pub fn new(config: &MailConfig) -> Result<Self, ObserverError> {
        let credentials = config.credentials();
        if credentials.is_none() {
            warn!(
                host = %config.host,
                "WEBMON_SMTP_LOGIN/WEBMON_SMTP_PASSWORD not set, sending mail without SMTP AUTH"
            );
        }
        let relay = SmtpRelay::starttls(&config.host, config.port, credentials)?;
        Self::with_transport(&config.from, &config.to, Box::new(relay))
    }

    /// 任意の送信経路でシンクを作成
    pub fn with_transport(
        from: &str,
        to: &[String],
        transport: Box<dyn MailTransport>,
    ) -> Result<Self, ObserverError> {
        if to.is_empty() {
            return Err(ObserverError::Mail("no recipients configured".to_string()));
        }
        let from = from.parse::<Mailbox>()?;
        let to = to
            .iter()
            .map(|addr| addr.parse::<Mailbox>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            from,
            to,
            transport,
        })
    }

    /// 件名と本文からメッセージを組み立てる
    pub fn compose(&self, subject: &str, body: &str) -> Result<Message, ObserverError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        Ok(builder.body(body.to_string())?)
    }
}

/// 失敗内容からメール本文を作る
pub(crate) fn failure_body(detail: &FailureDetail) -> String {
    match detail {
        FailureDetail::Status(code) => format!("GET returned {}", code),
        FailureDetail::Transport(message) => message.clone(),
    }
}

#[async_trait]
impl Observer for MailObserver {
    fn name(&self) -> &str {
        "mail"
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        let message = self.compose(&trouble_subject(url), &failure_body(detail))?;
        self.transport.send(message).await?;
        info!(url = %url, recipients = self.to.len(), "Failure mail sent");
        Ok(())
    }
}
