//! Sound system error types.
//!
//! Every error here is swallowed by the cue scheduler: audio is best-effort
//! and never blocks or fails a timer transition.

use thiserror::Error;

/// Errors that can occur in the audio engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SoundError {
    /// Audio device is not available (e.g., no output device connected).
    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceNotAvailable(String),

    /// The engine has not been unlocked yet.
    #[error("オーディオがまだ有効化されていません")]
    Locked,

    /// The audio thread or output stream failed.
    #[error("オーディオストリームエラー: {0}")]
    StreamError(String),

    /// Unlocking did not finish in time.
    #[error("オーディオの有効化がタイムアウトしました（{0}ms）")]
    UnlockTimeout(u64),

    /// Generic sound playback error.
    #[error("サウンド再生エラー: {0}")]
    PlaybackError(String),
}

impl SoundError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if a later unlock attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Locked | Self::UnlockTimeout(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "オーディオデバイスを接続してください",
            Self::Locked => "操作を行うとオーディオが有効になります",
            Self::StreamError(_) => "オーディオ設定を確認してください",
            Self::UnlockTimeout(_) => "もう一度操作してください",
            Self::PlaybackError(_) => "アプリケーションを再起動してください",
        }
    }
}
