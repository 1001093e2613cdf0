//! ポーリングスケジューラー（Monitor）
//!
//! 1つのURLについて「チェック → 分類 → 配信 → 待機」を繰り返すタスクと、
//! その停止用キャンセルトークンを所有する。
//!
//! - 待機は固定遅延（fixed-delay）。次のチェックは前回の配信完了から`interval`後に始まる
//! - キャンセルはループ先頭と待機中にのみ確認する。実行中のGETは中断しない
//! - ループ終了時に全オブザーバーを登録順に1回だけcloseする

pub mod outcome;
pub mod probe;

pub use outcome::{FailureDetail, PollOutcome, SUCCESS_STATUS};
pub use probe::HttpProbe;

use crate::error::{WatchError, WatchResult};
use crate::observer::{Dispatcher, HookFailurePolicy, Observer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Monitorのライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// 作成済み（未開始）
    Created,
    /// ポーリング中
    Running,
    /// 停止要求を受け、実行中の反復の完了を待っている
    Stopping,
    /// ループが終了し、オブザーバーはclose済み
    Stopped,
}

/// 1つのURLを監視するポーリングスケジューラー
pub struct Monitor {
    url: String,
    interval: Duration,
    probe: HttpProbe,
    policy: HookFailurePolicy,
    /// 開始時にタスクへ移される
    observers: std::sync::Mutex<Option<Vec<Box<dyn Observer>>>>,
    state: Arc<watch::Sender<MonitorState>>,
    cancel: CancellationToken,
    /// 開始処理全体と停止処理の排他にも使う
    task: Mutex<Option<JoinHandle<()>>>,
    iterations: Arc<AtomicU64>,
}

impl Monitor {
    /// 新しいMonitorを作成（Created状態、まだポーリングしない）
    pub fn new(
        url: impl Into<String>,
        interval: Duration,
        observers: Vec<Box<dyn Observer>>,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Created);
        Self {
            url: url.into(),
            interval,
            probe: HttpProbe::new(),
            policy: HookFailurePolicy::default(),
            observers: std::sync::Mutex::new(Some(observers)),
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            iterations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// フック失敗時の扱いを設定
    pub fn with_hook_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 作成して即座に開始する
    pub async fn spawn(
        url: impl Into<String>,
        interval: Duration,
        observers: Vec<Box<dyn Observer>>,
    ) -> WatchResult<Self> {
        let monitor = Self::new(url, interval, observers);
        monitor.start().await?;
        Ok(monitor)
    }

    /// 監視対象URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// チェック間隔
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 現在の状態
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// 状態変化の購読
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    /// 完了したポーリング回数
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// 全オブザーバーをopenし、ポーリングタスクを起動する
    ///
    /// いずれかの`open()`が失敗した場合はポーリングを始めずにエラーを返す。
    /// このときMonitorはStopped状態になる。
    pub async fn start(&self) -> WatchResult<()> {
        let mut task = self.task.lock().await;

        let observers = self
            .observers
            .lock()
            .map_err(|_| WatchError::Join("observer list poisoned".to_string()))?
            .take()
            .ok_or_else(|| WatchError::AlreadyStarted(self.url.clone()))?;

        let dispatcher = Dispatcher::new(observers, self.policy);
        if let Err(e) = dispatcher.open_all().await {
            self.state.send_replace(MonitorState::Stopped);
            return Err(e);
        }

        self.state.send_replace(MonitorState::Running);
        info!(
            url = %self.url,
            interval_secs = self.interval.as_secs(),
            observers = ?dispatcher.names(),
            "Monitor started"
        );

        let poll = PollLoop {
            url: self.url.clone(),
            interval: self.interval,
            probe: self.probe.clone(),
            dispatcher,
            cancel: self.cancel.clone(),
            state: Arc::clone(&self.state),
            iterations: Arc::clone(&self.iterations),
        };
        *task = Some(tokio::spawn(poll.run()));
        Ok(())
    }

    /// 停止を要求し、実行中の反復とオブザーバーのcloseが終わるまで待つ
    ///
    /// 何度呼んでも、複数箇所から同時に呼んでもcloseは1回だけ行われる。
    /// 後から呼んだ側も最初の停止が完了するまで待つ。
    pub async fn stop(&self) -> WatchResult<()> {
        self.cancel.cancel();

        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            // 未開始のMonitorはオブザーバーを破棄してStoppedにする
            if let Ok(mut observers) = self.observers.lock() {
                if observers.take().is_some() {
                    self.state.send_replace(MonitorState::Stopped);
                }
            }
            return Ok(());
        };

        self.state.send_if_modified(|state| {
            if *state == MonitorState::Running {
                *state = MonitorState::Stopping;
                true
            } else {
                false
            }
        });
        debug!(url = %self.url, "Waiting for monitor task to finish");

        let result = handle.await;
        self.state.send_replace(MonitorState::Stopped);
        match result {
            Ok(()) => {
                info!(url = %self.url, iterations = self.iterations(), "Monitor stopped");
                Ok(())
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Monitor task ended abnormally");
                Err(WatchError::Join(e.to_string()))
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        // stop()されずに破棄された場合もタスクを終了させ、オブザーバーをcloseさせる
        self.cancel.cancel();
    }
}

/// タスク側が所有するループ状態
struct PollLoop {
    url: String,
    interval: Duration,
    probe: HttpProbe,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    state: Arc<watch::Sender<MonitorState>>,
    iterations: Arc<AtomicU64>,
}

impl PollLoop {
    async fn run(self) {
        while !self.cancel.is_cancelled() {
            let outcome = self.probe.check(&self.url).await;
            match &outcome {
                PollOutcome::Success { code } => {
                    debug!(url = %self.url, status = code, "Poll succeeded");
                }
                PollOutcome::Failure(detail) => {
                    warn!(url = %self.url, detail = %detail, "Poll failed");
                }
            }

            let report = self.dispatcher.dispatch(&self.url, &outcome).await;
            if report.hook_failures > 0 {
                debug!(
                    url = %self.url,
                    hook_failures = report.hook_failures,
                    rebroadcast = report.rebroadcast,
                    "Dispatch completed with hook failures"
                );
            }
            self.iterations.fetch_add(1, Ordering::SeqCst);

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.dispatcher.close_all().await;
        self.state.send_replace(MonitorState::Stopped);
        debug!(url = %self.url, "Poll loop exited");
    }
}
