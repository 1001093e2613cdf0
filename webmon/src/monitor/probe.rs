//! HTTPプローブ
//!
//! 監視対象URLへGETを送信し、結果を[`PollOutcome`]に分類する。
//!
//! リクエスト単位のタイムアウトは設定しない。応答しないサーバーに対しては
//! GETが無期限にブロックし、その間`stop()`も完了しない（既知の制約）。

use super::outcome::PollOutcome;
use reqwest::Client;
use std::error::Error as _;
use tracing::debug;

/// HTTPプローブ
#[derive(Clone, Debug, Default)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// 新しいプローブを作成（タイムアウトなしのクライアント）
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// 1回分のチェックを実行
    ///
    /// 応答が得られた場合はステータスコードで分類し、
    /// 通信・プロトコルエラーはエラー説明文を持つ失敗として返す。
    pub async fn check(&self, url: &str) -> PollOutcome {
        match self.client.get(url).send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                debug!(url = %url, status = code, "GET completed");
                PollOutcome::from_status(code)
            }
            Err(e) => {
                let message = describe_error(&e);
                debug!(url = %url, error = %message, "GET failed");
                PollOutcome::transport(message)
            }
        }
    }
}

/// reqwestのエラーを原因チェーン込みの説明文に変換
///
/// reqwestのトップレベルメッセージは原因を含まないため、`source()`を辿って連結する。
fn describe_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::outcome::FailureDetail;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_check_200_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HttpProbe::new();
        let outcome = probe.check(&format!("{}/health", server.uri())).await;
        assert_eq!(outcome, PollOutcome::Success { code: 200 });
    }

    #[tokio::test]
    async fn test_check_500_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = HttpProbe::new();
        let outcome = probe.check(&server.uri()).await;
        assert_eq!(outcome, PollOutcome::Failure(FailureDetail::Status(500)));
    }

    #[tokio::test]
    async fn test_check_connection_refused_is_transport_failure() {
        // 一度バインドして解放したポートには誰も待ち受けていない
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new();
        let outcome = probe.check(&format!("http://{}/", addr)).await;
        match outcome {
            PollOutcome::Failure(FailureDetail::Transport(message)) => {
                assert!(!message.is_empty());
            }
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_check_invalid_url_is_transport_failure() {
        let probe = HttpProbe::new();
        let outcome = probe.check("not a url").await;
        assert!(matches!(
            outcome,
            PollOutcome::Failure(FailureDetail::Transport(_))
        ));
    }
}
