//! 統合テスト用の共通ユーティリティ

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use webmon::{FailureDetail, Observer, ObserverError};

/// フック呼び出しの記録（`"<name>:<event>"`形式）
pub type Journal = Arc<Mutex<Vec<String>>>;

/// すべてのフック呼び出しを記録するオブザーバー
#[allow(dead_code)]
pub struct RecordingObserver {
    name: &'static str,
    journal: Journal,
    fail_open: bool,
    fail_success: bool,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Observer> {
        Box::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_open: false,
            fail_success: false,
        })
    }

    /// `open()`が失敗するオブザーバー
    pub fn refusing(name: &'static str, journal: &Journal) -> Box<dyn Observer> {
        Box::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_open: true,
            fail_success: false,
        })
    }

    /// `on_success()`が失敗するオブザーバー
    pub fn faulty(name: &'static str, journal: &Journal) -> Box<dyn Observer> {
        Box::new(Self {
            name,
            journal: Arc::clone(journal),
            fail_open: false,
            fail_success: true,
        })
    }

    fn record(&self, event: String) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, event));
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    fn name(&self) -> &str {
        self.name
    }

    async fn open(&self) -> Result<(), ObserverError> {
        self.record("open".to_string());
        if self.fail_open {
            return Err(ObserverError::Mail("relay refused".to_string()));
        }
        Ok(())
    }

    async fn on_success(&self, url: &str, code: u16) -> Result<(), ObserverError> {
        self.record(format!("success {} {}", url, code));
        if self.fail_success {
            return Err(ObserverError::Payload("broken sink".to_string()));
        }
        Ok(())
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        self.record(format!("failure {} {}", url, detail));
        Ok(())
    }

    async fn close(&self) {
        self.record("close".to_string());
    }
}

/// 記録内容のスナップショット
#[allow(dead_code)]
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// 条件を満たす記録が現れるまで待つ（最大5秒）
#[allow(dead_code)]
pub async fn wait_for(journal: &Journal, predicate: impl Fn(&[String]) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !predicate(&entries(journal)) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for journal: {:?}",
            entries(journal)
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 接続を拒否されるURL（一度バインドしたポートを解放して使う）
#[allow(dead_code)]
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/", addr)
}
