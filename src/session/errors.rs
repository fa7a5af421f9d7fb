use std::fmt;
use thiserror::Error;

/// Why a stream reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Disconnected,
    EndOfFile,
    DurationElapsed,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Disconnected => f.write_str("device disconnected"),
            EndReason::EndOfFile => f.write_str("end of recorded file"),
            EndReason::DurationElapsed => f.write_str("stream duration elapsed"),
        }
    }
}

/// Conditions that end a session attempt.
///
/// These are recorded as shared-state flags by the capture callbacks and
/// observed by the control loop; they are never returned across components.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInterrupt {
    #[error("Configuration changed while the session was running")]
    ConfigurationInterrupted,
    #[error("Capture session failed during setup")]
    SessionSetupFailed,
    #[error("Capture session reported a stream error")]
    StreamError,
    #[error("End of stream: {0}")]
    EndOfStream(EndReason),
    #[error("Exit requested")]
    UserExitRequested,
}

impl SessionInterrupt {
    /// Returns true for conditions reported as failures by the capture source.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SessionInterrupt::SessionSetupFailed | SessionInterrupt::StreamError
        )
    }
}
