//! ディスパッチャー
//!
//! 1回分のポーリング結果を、登録順に全オブザーバーへ配信する。
//!
//! フック内のpanicは捕捉してフック失敗として扱う。ポーリングタスクが
//! 巻き戻されると`close`が呼ばれなくなるため。

use super::Observer;
use crate::error::{ObserverError, WatchError, WatchResult};
use crate::monitor::{FailureDetail, PollOutcome};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// フックを実行し、panicを[`ObserverError::Panic`]に変換する
async fn guarded<F>(hook: F) -> Result<(), ObserverError>
where
    F: Future<Output = Result<(), ObserverError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(ObserverError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// フックが失敗したときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookFailurePolicy {
    /// 失敗をログに残し、残りのオブザーバーへは元の結果をそのまま配信する
    #[default]
    Isolate,
    /// 最初のフック失敗で元の結果の配信を打ち切り、そのエラー文を
    /// 通信エラーとして全オブザーバーの`on_failure`へ配信し直す
    ///
    /// オブザーバーの不具合がポーリング結果を覆い隠すため、互換目的でのみ使う。
    Rebroadcast,
}

/// 配信結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 失敗したフックの数（再配信中の失敗を含む）
    pub hook_failures: usize,
    /// 再配信が行われたか
    pub rebroadcast: bool,
}

/// 登録順を保持したオブザーバー列
pub struct Dispatcher {
    observers: Vec<Box<dyn Observer>>,
    policy: HookFailurePolicy,
}

impl Dispatcher {
    /// 新しいディスパッチャーを作成
    pub fn new(observers: Vec<Box<dyn Observer>>, policy: HookFailurePolicy) -> Self {
        Self { observers, policy }
    }

    /// 登録順のオブザーバー名
    pub fn names(&self) -> Vec<&str> {
        self.observers.iter().map(|o| o.name()).collect()
    }

    /// 全オブザーバーを登録順にopenする
    ///
    /// 途中で失敗した場合、それまでにopenしたオブザーバーを登録順にcloseしてから
    /// [`WatchError::ObserverInit`]を返す。失敗したオブザーバー自身はcloseしない。
    pub async fn open_all(&self) -> WatchResult<()> {
        for (index, observer) in self.observers.iter().enumerate() {
            if let Err(source) = guarded(observer.open()).await {
                warn!(
                    observer = observer.name(),
                    error = %source,
                    "Observer failed to open"
                );
                for opened in &self.observers[..index] {
                    opened.close().await;
                }
                return Err(WatchError::ObserverInit {
                    observer: observer.name().to_string(),
                    source,
                });
            }
            debug!(observer = observer.name(), "Observer opened");
        }
        Ok(())
    }

    /// 全オブザーバーを登録順にcloseする
    pub async fn close_all(&self) {
        for observer in &self.observers {
            let closed = guarded(async {
                observer.close().await;
                Ok(())
            })
            .await;
            match closed {
                Ok(()) => debug!(observer = observer.name(), "Observer closed"),
                Err(e) => {
                    warn!(observer = observer.name(), error = %e, "Observer failed to close");
                }
            }
        }
    }

    /// 1回分の結果を配信する
    pub async fn dispatch(&self, url: &str, outcome: &PollOutcome) -> DispatchReport {
        let mut report = DispatchReport::default();

        for observer in &self.observers {
            let result = match outcome {
                PollOutcome::Success { code } => guarded(observer.on_success(url, *code)).await,
                PollOutcome::Failure(detail) => guarded(observer.on_failure(url, detail)).await,
            };

            let Err(e) = result else {
                continue;
            };
            report.hook_failures += 1;
            warn!(
                observer = observer.name(),
                url = %url,
                error = %e,
                "Observer hook failed"
            );

            // 通信エラーの配信中に起きた失敗は再配信しない
            let already_transport = matches!(
                outcome,
                PollOutcome::Failure(FailureDetail::Transport(_))
            );
            if self.policy == HookFailurePolicy::Rebroadcast && !already_transport {
                report.rebroadcast = true;
                report.hook_failures += self.rebroadcast(url, &e).await;
                return report;
            }
        }

        report
    }

    /// フックのエラーを通信エラーとして全オブザーバーへ配信し直す
    async fn rebroadcast(&self, url: &str, cause: &ObserverError) -> usize {
        let detail = FailureDetail::Transport(cause.to_string());
        let mut failures = 0;
        for observer in &self.observers {
            if let Err(e) = guarded(observer.on_failure(url, &detail)).await {
                failures += 1;
                warn!(
                    observer = observer.name(),
                    url = %url,
                    error = %e,
                    "Observer hook failed during rebroadcast"
                );
            }
        }
        failures
    }
}
