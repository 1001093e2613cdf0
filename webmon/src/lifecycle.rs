//! ライフサイクルコントローラー
//!
//! URLごとに独立したMonitorを起動し、停止要求時にすべてを順番に停止する。
//! 停止したMonitorの再起動やリトライは行わない。

use crate::error::WatchResult;
use crate::monitor::{Monitor, MonitorState};
use crate::observer::{HookFailurePolicy, Observer};
use std::time::Duration;
use tracing::{error, info};

/// 監視対象1件分（URLと、そのMonitor専用のオブザーバー列）
pub struct MonitorTarget {
    /// 監視対象URL
    pub url: String,
    /// 登録順のオブザーバー
    pub observers: Vec<Box<dyn Observer>>,
}

impl MonitorTarget {
    /// 新しい監視対象を作成
    pub fn new(url: impl Into<String>, observers: Vec<Box<dyn Observer>>) -> Self {
        Self {
            url: url.into(),
            observers,
        }
    }
}

/// 複数Monitorの起動・停止を管理する
pub struct LifecycleController {
    monitors: Vec<Monitor>,
}

impl LifecycleController {
    /// 全対象のMonitorを共通の間隔で起動する
    pub async fn start(targets: Vec<MonitorTarget>, interval: Duration) -> WatchResult<Self> {
        Self::start_with_policy(targets, interval, HookFailurePolicy::default()).await
    }

    /// フック失敗時の扱いを指定して起動する
    ///
    /// いずれかのMonitorが起動に失敗した場合、起動済みのMonitorを停止してから
    /// エラーを返す。
    pub async fn start_with_policy(
        targets: Vec<MonitorTarget>,
        interval: Duration,
        policy: HookFailurePolicy,
    ) -> WatchResult<Self> {
        let mut controller = Self {
            monitors: Vec::with_capacity(targets.len()),
        };

        for target in targets {
            let monitor =
                Monitor::new(target.url, interval, target.observers).with_hook_policy(policy);
            if let Err(e) = monitor.start().await {
                error!(url = %monitor.url(), error = %e, "Failed to start monitor");
                if let Err(stop_err) = controller.stop_all().await {
                    error!(error = %stop_err, "Failed to stop monitors after start error");
                }
                return Err(e);
            }
            controller.monitors.push(monitor);
        }

        info!(
            count = controller.monitors.len(),
            interval_secs = interval.as_secs(),
            "All monitors started"
        );
        Ok(controller)
    }

    /// 管理中のMonitor数
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    /// Monitorが1つもないか
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// 各Monitorの状態（起動順）
    pub fn states(&self) -> Vec<MonitorState> {
        self.monitors.iter().map(Monitor::state).collect()
    }

    /// 全Monitorを順番に停止し、すべて終了するまで待つ
    ///
    /// 途中のMonitorが異常終了していても残りの停止は続け、最初のエラーを返す。
    pub async fn stop_all(&self) -> WatchResult<()> {
        let mut first_error = None;
        for monitor in &self.monitors {
            if let Err(e) = monitor.stop().await {
                error!(url = %monitor.url(), error = %e, "Failed to stop monitor cleanly");
                first_error.get_or_insert(e);
            }
        }
        info!(count = self.monitors.len(), "All monitors stopped");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ObserverError, WatchError};
    use async_trait::async_trait;

    struct Refusing;

    #[async_trait]
    impl Observer for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn open(&self) -> Result<(), ObserverError> {
            Err(ObserverError::NotOpen("refusing"))
        }
    }

    fn unreachable_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_start_and_stop_all() {
        let targets = vec![
            MonitorTarget::new(unreachable_url(), vec![]),
            MonitorTarget::new(unreachable_url(), vec![]),
        ];
        let controller = LifecycleController::start(targets, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(controller.len(), 2);
        assert!(controller
            .states()
            .iter()
            .all(|s| *s == MonitorState::Running));

        controller.stop_all().await.unwrap();
        assert!(controller
            .states()
            .iter()
            .all(|s| *s == MonitorState::Stopped));
    }

    #[tokio::test]
    async fn test_start_error_propagates() {
        let targets = vec![
            MonitorTarget::new(unreachable_url(), vec![]),
            MonitorTarget::new(unreachable_url(), vec![Box::new(Refusing)]),
        ];
        let result = LifecycleController::start(targets, Duration::from_secs(60)).await;
        match result {
            Err(WatchError::ObserverInit { observer, .. }) => assert_eq!(observer, "refusing"),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("start should fail"),
        }
    }

    #[tokio::test]
    async fn test_empty_controller() {
        let controller = LifecycleController::start(vec![], Duration::from_secs(1))
            .await
            .unwrap();
        assert!(controller.is_empty());
        controller.stop_all().await.unwrap();
    }
}
