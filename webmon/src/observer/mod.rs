//! オブザーバー（通知シンク）
//!
//! ポーリング結果を受け取るシンクの共通インターフェースと、その実装群。
//!
//! フックは`open → (on_success | on_failure)* → close`の順で、所有する
//! [`Monitor`](crate::monitor::Monitor)から呼び出される。使わないフックは
//! デフォルト実装（何もしない）のままでよい。

pub mod chat;
pub mod console;
pub mod dispatch;
pub mod mail;
pub mod store;

pub use chat::ChatObserver;
pub use console::ConsoleObserver;
pub use dispatch::{DispatchReport, Dispatcher, HookFailurePolicy};
pub use mail::MailObserver;
pub use store::StoreObserver;

use crate::error::ObserverError;
use crate::monitor::FailureDetail;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

/// ポーリング結果の通知先
///
/// フックは`&self`で呼ばれる。同じインスタンスを複数のMonitorで共有する場合、
/// 内部状態のスレッド安全性は実装側が保証すること。
#[async_trait]
pub trait Observer: Send + Sync {
    /// ログ出力用の名前
    fn name(&self) -> &str;

    /// 最初のポーリングの前に1回だけ呼ばれる
    async fn open(&self) -> Result<(), ObserverError> {
        Ok(())
    }

    /// GETが200を返したとき
    async fn on_success(&self, _url: &str, _code: u16) -> Result<(), ObserverError> {
        Ok(())
    }

    /// 200以外の応答、または通信エラーのとき
    async fn on_failure(&self, _url: &str, _detail: &FailureDetail) -> Result<(), ObserverError> {
        Ok(())
    }

    /// ループ終了後に1回だけ呼ばれる
    async fn close(&self) {}
}

#[async_trait]
impl<T: Observer + ?Sized> Observer for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn open(&self) -> Result<(), ObserverError> {
        (**self).open().await
    }

    async fn on_success(&self, url: &str, code: u16) -> Result<(), ObserverError> {
        (**self).on_success(url, code).await
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        (**self).on_failure(url, detail).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// ISO-8601（UTC）形式の現在時刻
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// 障害通知の見出し
pub(crate) fn trouble_subject(url: &str) -> String {
    format!("TROUBLE ACCESSING {}", url)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl Observer for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        let observer = Silent;
        assert!(observer.open().await.is_ok());
        assert!(observer.on_success("http://x/", 200).await.is_ok());
        assert!(observer
            .on_failure("http://x/", &FailureDetail::Status(500))
            .await
            .is_ok());
        observer.close().await;
    }

    #[test]
    fn test_timestamp_is_utc_iso8601() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_trouble_subject() {
        assert_eq!(trouble_subject("http://x/"), "TROUBLE ACCESSING http://x/");
    }

    #[tokio::test]
    async fn test_arc_delegates_name() {
        let shared: Arc<dyn Observer> = Arc::new(Silent);
        let boxed: Box<dyn Observer> = Box::new(Arc::clone(&shared));
        assert_eq!(boxed.name(), "silent");
    }
}
