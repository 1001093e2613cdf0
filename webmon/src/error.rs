//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! - [`WatchError`]: 起動・停止など監視プロセス全体のエラー
//! - [`ObserverError`]: 通知シンク（オブザーバー）のフック内で発生したエラー
//!
//! ポーリング自体の失敗（非200応答・通信エラー）はエラー型ではなく
//! [`crate::monitor::FailureDetail`] としてオブザーバーに配信される。

use thiserror::Error;

/// 監視プロセス全体のエラー
#[derive(Debug, Error)]
pub enum WatchError {
    /// Configuration error (invalid or missing arguments)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An observer failed to open; the monitor was not started
    #[error("Observer '{observer}' failed to open: {source}")]
    ObserverInit {
        /// 失敗したオブザーバー名
        observer: String,
        /// 元のエラー
        #[source]
        source: ObserverError,
    },

    /// start() was called on a monitor that is not in the Created state
    #[error("Monitor for {0} has already been started")]
    AlreadyStarted(String),

    /// The polling task terminated abnormally
    #[error("Monitor task join error: {0}")]
    Join(String),
}

/// オブザーバー（通知シンク）のエラー
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mail composition or delivery error
    #[error("Mail error: {0}")]
    Mail(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload encoding error
    #[error("Payload error: {0}")]
    Payload(String),

    /// A hook panicked; the panic was contained by the dispatcher
    #[error("Observer panicked: {0}")]
    Panic(String),

    /// A hook was invoked before open() or after close()
    #[error("{0} is not open")]
    NotOpen(&'static str),
}

impl From<lettre::error::Error> for ObserverError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Mail(err.to_string())
    }
}

impl From<lettre::address::AddressError> for ObserverError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::Mail(format!("invalid address: {}", err))
    }
}

impl From<lettre::transport::smtp::Error> for ObserverError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Mail(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for ObserverError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Self::Payload(err.to_string())
    }
}

/// 監視プロセス用のResult型エイリアス
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_init_error_names_observer() {
        let err = WatchError::ObserverInit {
            observer: "store".to_string(),
            source: ObserverError::NotOpen("store"),
        };
        let message = err.to_string();
        assert!(message.contains("'store'"));
        assert!(message.contains("store is not open"));
    }

    #[test]
    fn test_observer_init_error_exposes_source() {
        use std::error::Error as _;

        let err = WatchError::ObserverInit {
            observer: "mail".to_string(),
            source: ObserverError::Mail("relay refused".to_string()),
        };
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "Mail error: relay refused");
    }

    #[test]
    fn test_config_error_display() {
        let err = WatchError::Config("repeat must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: repeat must be positive"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ObserverError = io.into();
        assert!(matches!(err, ObserverError::Io(_)));
    }
}
