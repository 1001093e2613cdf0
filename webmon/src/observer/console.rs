//! コンソールシンク
//!
//! ポーリング結果を1行ずつ標準出力（または任意のWriter）へ書き出す。

use super::{timestamp, Observer};
use crate::error::ObserverError;
use crate::monitor::FailureDetail;
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

/// コンソールへ結果を出力するオブザーバー
pub struct ConsoleObserver {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleObserver {
    /// 標準出力へ書き出すシンクを作成
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    /// 任意のWriterへ書き出すシンクを作成
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_line(&self, line: &str) -> Result<(), ObserverError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("console writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// 結果1件分の出力行を組み立てる
pub(crate) fn format_line(ts: &str, url: &str, outcome: Result<u16, &FailureDetail>) -> String {
    match outcome {
        Ok(code) => format!("{} Active: GET {} returned {}", ts, url, code),
        Err(FailureDetail::Status(code)) => format!("{} ERROR: GET {} returned {}", ts, url, code),
        Err(FailureDetail::Transport(message)) => format!("{} ERROR GET {}: {}", ts, url, message),
    }
}

#[async_trait]
impl Observer for ConsoleObserver {
    fn name(&self) -> &str {
        "console"
    }

    async fn on_success(&self, url: &str, code: u16) -> Result<(), ObserverError> {
        self.write_line(&format_line(&timestamp(), url, Ok(code)))
    }

    async fn on_failure(&self, url: &str, detail: &FailureDetail) -> Result<(), ObserverError> {
        self.write_line(&format_line(&timestamp(), url, Err(detail)))
    }
}
