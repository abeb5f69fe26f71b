pub type BitterResult<T> = Result<T, BitterError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum BitterError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("detection error: {0}")]
    Detection(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("processing cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BitterError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Decode(_) => ErrorCode::DecodeFailed,
            Self::Encode(_) => ErrorCode::EncodeFailed,
            Self::Unsupported(_) => ErrorCode::UnsupportedPlatform,
            Self::Cancelled => ErrorCode::VideoProcessCancelled,
            Self::Validation(_) | Self::Detection(_) | Self::Other(_) => ErrorCode::Unknown,
        }
    }
}

/// Stable error codes carried by task `error` events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnsupportedPlatform,
    DecodeFailed,
    EncodeFailed,
    VideoProcessCancelled,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedPlatform => "UNSUPPORTED_PLATFORM",
            Self::DecodeFailed => "DECODE_FAILED",
            Self::EncodeFailed => "ENCODE_FAILED",
            Self::VideoProcessCancelled => "VIDEO_PROCESS_CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
