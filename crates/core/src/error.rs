/// Terminal failures of one latency run. None of them are retried by the
/// engine; the caller decides whether to run again.
#[derive(thiserror::Error, Debug)]
pub enum LatencyError {
    #[error("Failed to take screenshot.")]
    CaptureUnavailable,

    #[error("Failed to find test pattern on screen.")]
    PatternNotFound,

    #[error("Failed to read data from test pattern.")]
    PatternUnreadable,

    #[error("{0}")]
    ProtocolViolation(String),

    #[error("{0}")]
    Unresponsive(String),

    #[error("Test window moved during test. The test window must remain stationary and focused during the entire test.")]
    WindowMoved,

    #[error("Test aborted.")]
    Aborted,

    #[error("Timeout.")]
    Timeout,

    #[error("{0}")]
    Input(String),

    #[error("Failed to open native reference window: {0}")]
    NativeReference(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Capture,
    NotFound,
    Protocol,
    Unresponsive,
    Instability,
    Aborted,
    Timeout,
    Platform,
}

impl LatencyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CaptureUnavailable => ErrorClass::Capture,
            Self::PatternNotFound => ErrorClass::NotFound,
            Self::ProtocolViolation(_) => ErrorClass::Protocol,
            Self::Unresponsive(_) => ErrorClass::Unresponsive,
            Self::PatternUnreadable | Self::WindowMoved => ErrorClass::Instability,
            Self::Aborted => ErrorClass::Aborted,
            Self::Timeout => ErrorClass::Timeout,
            Self::Input(_) | Self::NativeReference(_) => ErrorClass::Platform,
        }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    pub fn unresponsive(msg: impl Into<String>) -> Self {
        Self::Unresponsive(msg.into())
    }
}

/// Rejected wire-level magic pattern.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("magic pattern must be {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("invalid hex digits {0:?} in magic pattern")]
    InvalidHex(String),
}
