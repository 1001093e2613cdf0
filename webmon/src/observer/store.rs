//! 永続化シンク
//!
//! SQLiteの`status`テーブルへ、結果1件につき1行を追記する。
//!
//! 同じインスタンスを複数のMonitorで共有できるよう、open回数を数えて
//! 最初の`open()`で接続し、最後の`close()`で切断する。

use super::{timestamp, Observer};
use crate::error::ObserverError;
use crate::monitor::FailureDetail;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// デフォルトのデータベースファイル
pub const DEFAULT_DB_PATH: &str = "monitor.db";

const CREATE_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS status (date TEXT, url TEXT, info TEXT)";

const INSERT_SQL: &str = "INSERT INTO status (date, url, info) VALUES (?, ?, ?)";

/// `status`テーブルの1行
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusRecord {
    /// 記録時刻（ISO-8601 UTC）
    pub date: String,
    /// 監視対象URL
    pub url: String,
    /// ステータスコードまたはエラー文
    pub info: String,
}

#[derive(Default)]
struct StoreState {
    pool: Option<SqlitePool>,
    opens: usize,
}

/// SQLiteへ結果を記録するオブザーバー
pub struct StoreObserver {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl StoreObserver {
    /// 指定ファイルへ記録するシンクを作成（接続は`open()`時）
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// 接続中かどうか
    pub async fn is_open(&self) -> bool {
        self.state.lock().await.pool.is_some()
    }

    /// 記録済みの行を挿入順に取得
    pub async fn records(&self) -> Result<Vec<StatusRecord>, ObserverError> {
        let pool = self.pool().await?;
        let rows = sqlx::query_as::<_, StatusRecord>(
            "SELECT date, url, info FROM status ORDER BY rowid ASC",
        )
        .fetch_all(&pool)
        .await?;
        Ok(rows)
    }

    async fn pool(&self) -> Result<SqlitePool, ObserverError> {
        self.state
            .lock()
            .await
            .pool
            .clone()
            .ok_or(ObserverError::NotOpen("store"))
    }

    async fn append(&self, url: &str, info: &str) -> Result<(), ObserverError> {
        let pool = self.pool().await?;
        sqlx::query(INSERT_SQL)
            .bind(timestamp())
            .bind(url)
            .bind(info)
            .execute(&pool)
            .await?;
        Ok(())
    }

    async fn connect(&self) -> Result<SqlitePool, ObserverError> {
        // SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        // 既存テーブルがあれば何もしない（既存の行は保持）
        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await?;
        Ok(pool)
    }
}

#[async_trait]
impl Observer for StoreObserver {
    fn name(&self) -> &str {
        "store"
    }

    async fn open(&self) -> Result<(), ObserverError> {
        let mut state = self.state.lock().await;
        if state.pool.is_none() {
            let pool = self.connect().await?;
            info!(path = %self.path.display(), "Status store opened");
            state.pool = Some(pool);
        }
        state.opens += 1;
        Ok(())
    }

    async fn on_success(&self, url: &str, code: u16) -> Result<(), ObserverError> {
        self.append(url, &code.to_string()).await
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        self.append(url, &detail.to_string()).await
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.opens = state.opens.saturating_sub(1);
        if state.opens > 0 {
            debug!(remaining = state.opens, "Status store still in use");
            return;
        }
        if let Some(pool) = state.pool.take() {
            pool.close().await;
            info!(path = %self.path.display(), "Status store closed");
        }
    }
}
