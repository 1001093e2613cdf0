//! ポーリング結果
//!
//! 1回のポーリングで生成され、ディスパッチャーが消費する結果型。

use std::fmt;

/// 成功とみなすHTTPステータスコード
pub const SUCCESS_STATUS: u16 = 200;

/// ポーリング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// GETが200を返した
    Success {
        /// HTTPステータスコード（常に200）
        code: u16,
    },
    /// 200以外の応答、または通信エラー
    Failure(FailureDetail),
}

/// 失敗の詳細
///
/// 非200応答は例外ではなくデータとして扱い、ステータスコードをそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDetail {
    /// 応答は得られたがステータスが200以外
    Status(u16),
    /// 通信・プロトコルエラー（エラー説明文）
    Transport(String),
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "{}", code),
            Self::Transport(message) => f.write_str(message),
        }
    }
}

impl PollOutcome {
    /// HTTPステータスコードから結果を分類する
    pub fn from_status(code: u16) -> Self {
        if code == SUCCESS_STATUS {
            Self::Success { code }
        } else {
            Self::Failure(FailureDetail::Status(code))
        }
    }

    /// 通信エラーから結果を生成する
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Failure(FailureDetail::Transport(message.into()))
    }
}
