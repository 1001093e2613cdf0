//! webmon
//!
//! URLを定期的にGETし、結果を登録済みのオブザーバー（コンソール・SQLite・
//! メール・チャット）へ配信する軽量な死活監視ツール

#![warn(missing_docs)]

/// CLIインターフェース
pub mod cli;

/// 設定管理（環境変数ヘルパー・シンク設定）
pub mod config;

/// エラー型定義
pub mod error;

/// ライフサイクル管理（複数Monitorの起動・停止）
pub mod lifecycle;

/// ロギング初期化ユーティリティ
pub mod logging;

/// ポーリングスケジューラー
pub mod monitor;

/// オブザーバー契約・ディスパッチャー・各シンク
pub mod observer;

/// オペレーターからの停止要求
pub mod shutdown;

pub use error::{ObserverError, WatchError, WatchResult};
pub use lifecycle::{LifecycleController, MonitorTarget};
pub use monitor::{FailureDetail, Monitor, MonitorState, PollOutcome};
pub use observer::Observer;
