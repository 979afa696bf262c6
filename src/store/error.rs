//! Duration store error types.
//!
//! Store errors never escape [`DurationStore`](super::DurationStore); they are
//! logged and the store falls back to the last valid or default values.

use thiserror::Error;

/// Errors raised by key-value persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The config directory could not be determined.
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    /// Reading or writing the backing file failed.
    #[error("設定ファイルの入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file does not contain a JSON object.
    #[error("設定ファイルの形式が不正です: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Returns true if the backing file exists but could not be parsed.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
