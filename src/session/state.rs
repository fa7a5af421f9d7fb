//! Pure state machine for the session control loop.
//!
//! `transition(Phase, Trigger, exit_on_end) -> Phase`
//!
//! The control loop blocks until [`pending_trigger`] reports something for its
//! current phase, then asks [`transition`] where to go. Invalid transitions
//! return the current phase unchanged. Neither function performs I/O.

use super::errors::SessionInterrupt;
use super::shared_state::Observation;

/// Process exit status produced when the loop terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => std::process::ExitCode::SUCCESS,
            ExitStatus::Failure => std::process::ExitCode::FAILURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Blocked until the configuration enables at least one stream.
    WaitingForEnabledStreams,

    /// Capture adapter launched, waiting for the source to become ready.
    Starting,

    /// Samples flowing; writer open if an output path was configured.
    Streaming,

    /// Attempt abandoned because the configuration changed materially.
    Restarting,

    /// Attempt ended by an error or end of stream; blocked until the
    /// configuration changes materially.
    WaitingForUserAction,

    /// Terminal.
    Exiting { status: ExitStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StreamsEnabled,
    Ready,
    Interrupted(SessionInterrupt),
}

/// Returns the trigger the loop should act on in `phase`, if any.
///
/// When several conditions hold at once the precedence is: configuration
/// change, then readiness or end of stream, then stream error, then exit.
pub fn pending_trigger(phase: &SessionPhase, observed: &Observation) -> Option<Trigger> {
    use SessionInterrupt::*;

    match phase {
        SessionPhase::WaitingForEnabledStreams => {
            if observed.exit_requested {
                Some(Trigger::Interrupted(UserExitRequested))
            } else if observed.streams_enabled {
                Some(Trigger::StreamsEnabled)
            } else {
                None
            }
        }
        SessionPhase::Starting => {
            if observed.config_changed {
                Some(Trigger::Interrupted(ConfigurationInterrupted))
            } else if observed.ready {
                Some(Trigger::Ready)
            } else if observed.stream_error {
                Some(Trigger::Interrupted(SessionSetupFailed))
            } else if observed.exit_requested {
                Some(Trigger::Interrupted(UserExitRequested))
            } else {
                None
            }
        }
        SessionPhase::Streaming => {
            if observed.config_changed {
                Some(Trigger::Interrupted(ConfigurationInterrupted))
            } else if let Some(reason) = observed.end_of_stream {
                Some(Trigger::Interrupted(EndOfStream(reason)))
            } else if observed.stream_error {
                Some(Trigger::Interrupted(StreamError))
            } else if observed.exit_requested {
                Some(Trigger::Interrupted(UserExitRequested))
            } else {
                None
            }
        }
        SessionPhase::WaitingForUserAction => {
            if observed.config_changed {
                Some(Trigger::Interrupted(ConfigurationInterrupted))
            } else if observed.exit_requested {
                Some(Trigger::Interrupted(UserExitRequested))
            } else {
                None
            }
        }
        SessionPhase::Restarting | SessionPhase::Exiting { .. } => None,
    }
}

/// Pure state transition function.
pub fn transition(phase: SessionPhase, trigger: Trigger, exit_on_end: bool) -> SessionPhase {
    use SessionInterrupt::*;

    match (phase, trigger) {
        (SessionPhase::Exiting { .. }, _) => phase,

        (_, Trigger::Interrupted(UserExitRequested)) => SessionPhase::Exiting {
            status: ExitStatus::Success,
        },

        (SessionPhase::WaitingForEnabledStreams, Trigger::StreamsEnabled) => SessionPhase::Starting,

        (SessionPhase::Starting, Trigger::Ready) => SessionPhase::Streaming,

        (
            SessionPhase::Starting | SessionPhase::Streaming,
            Trigger::Interrupted(ConfigurationInterrupted),
        ) => SessionPhase::Restarting,

        // A writer that cannot be opened fails setup after Starting
        (
            SessionPhase::Starting | SessionPhase::Streaming,
            Trigger::Interrupted(SessionSetupFailed),
        )
        | (SessionPhase::Streaming, Trigger::Interrupted(StreamError)) => {
            if exit_on_end {
                SessionPhase::Exiting {
                    status: ExitStatus::Failure,
                }
            } else {
                SessionPhase::WaitingForUserAction
            }
        }

        (SessionPhase::Streaming, Trigger::Interrupted(EndOfStream(_))) => {
            if exit_on_end {
                SessionPhase::Exiting {
                    status: ExitStatus::Success,
                }
            } else {
                SessionPhase::WaitingForUserAction
            }
        }

        (SessionPhase::WaitingForUserAction, Trigger::Interrupted(ConfigurationInterrupted)) => {
            SessionPhase::WaitingForEnabledStreams
        }

        (SessionPhase::Restarting, _) => SessionPhase::WaitingForEnabledStreams,

        // Invalid transition: stay put
        _ => phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::errors::EndReason;

    fn quiet() -> Observation {
        Observation::default()
    }

    #[test]
    fn test_waiting_for_streams_blocks_without_enabled_streams() {
        let phase = SessionPhase::WaitingForEnabledStreams;
        assert_eq!(pending_trigger(&phase, &quiet()), None);

        let observed = Observation {
            streams_enabled: true,
            ..quiet()
        };
        assert_eq!(
            pending_trigger(&phase, &observed),
            Some(Trigger::StreamsEnabled)
        );
        assert_eq!(
            transition(phase, Trigger::StreamsEnabled, false),
            SessionPhase::Starting
        );
    }

    #[test]
    fn test_exit_wins_over_enabled_streams() {
        let observed = Observation {
            streams_enabled: true,
            exit_requested: true,
            ..quiet()
        };
        assert_eq!(
            pending_trigger(&SessionPhase::WaitingForEnabledStreams, &observed),
            Some(Trigger::Interrupted(SessionInterrupt::UserExitRequested))
        );
    }

    #[test]
    fn test_starting_to_streaming_on_ready() {
        let observed = Observation {
            ready: true,
            ..quiet()
        };
        let trigger = pending_trigger(&SessionPhase::Starting, &observed).unwrap();
        assert_eq!(
            transition(SessionPhase::Starting, trigger, false),
            SessionPhase::Streaming
        );
    }

    #[test]
    fn test_config_change_wins_over_ready() {
        let observed = Observation {
            ready: true,
            config_changed: true,
            ..quiet()
        };
        let trigger = pending_trigger(&SessionPhase::Starting, &observed).unwrap();
        assert_eq!(
            transition(SessionPhase::Starting, trigger, true),
            SessionPhase::Restarting
        );
    }

    #[test]
    fn test_setup_error_parks_or_fails() {
        let trigger = Trigger::Interrupted(SessionInterrupt::SessionSetupFailed);

        assert_eq!(
            transition(SessionPhase::Starting, trigger, false),
            SessionPhase::WaitingForUserAction
        );
        assert_eq!(
            transition(SessionPhase::Starting, trigger, true),
            SessionPhase::Exiting {
                status: ExitStatus::Failure
            }
        );
    }

    #[test]
    fn test_writer_setup_failure_while_streaming() {
        let trigger = Trigger::Interrupted(SessionInterrupt::SessionSetupFailed);
        assert_eq!(
            transition(SessionPhase::Streaming, trigger, false),
            SessionPhase::WaitingForUserAction
        );
        assert_eq!(
            transition(SessionPhase::Streaming, trigger, true),
            SessionPhase::Exiting {
                status: ExitStatus::Failure
            }
        );
    }

    #[test]
    fn test_end_of_stream_exits_successfully_with_exit_on_end() {
        let observed = Observation {
            end_of_stream: Some(EndReason::EndOfFile),
            ..quiet()
        };
        let trigger = pending_trigger(&SessionPhase::Streaming, &observed).unwrap();

        assert_eq!(
            transition(SessionPhase::Streaming, trigger, true),
            SessionPhase::Exiting {
                status: ExitStatus::Success
            }
        );
        assert_eq!(
            transition(SessionPhase::Streaming, trigger, false),
            SessionPhase::WaitingForUserAction
        );
    }

    #[test]
    fn test_stream_error_while_streaming() {
        let observed = Observation {
            stream_error: true,
            ..quiet()
        };
        let trigger = pending_trigger(&SessionPhase::Streaming, &observed).unwrap();
        assert_eq!(
            trigger,
            Trigger::Interrupted(SessionInterrupt::StreamError)
        );
        assert_eq!(
            transition(SessionPhase::Streaming, trigger, true),
            SessionPhase::Exiting {
                status: ExitStatus::Failure
            }
        );
    }

    #[test]
    fn test_end_of_stream_wins_over_error() {
        let observed = Observation {
            stream_error: true,
            end_of_stream: Some(EndReason::Disconnected),
            ..quiet()
        };
        assert_eq!(
            pending_trigger(&SessionPhase::Streaming, &observed),
            Some(Trigger::Interrupted(SessionInterrupt::EndOfStream(
                EndReason::Disconnected
            )))
        );
    }

    #[test]
    fn test_ready_is_ignored_while_streaming() {
        let observed = Observation {
            ready: true,
            ..quiet()
        };
        assert_eq!(pending_trigger(&SessionPhase::Streaming, &observed), None);
        assert_eq!(
            transition(SessionPhase::Streaming, Trigger::Ready, false),
            SessionPhase::Streaming
        );
    }

    #[test]
    fn test_user_action_requires_material_change() {
        let phase = SessionPhase::WaitingForUserAction;
        let stale = Observation {
            streams_enabled: true,
            stream_error: true,
            ..quiet()
        };
        assert_eq!(pending_trigger(&phase, &stale), None);

        let changed = Observation {
            config_changed: true,
            ..quiet()
        };
        let trigger = pending_trigger(&phase, &changed).unwrap();
        assert_eq!(
            transition(phase, trigger, false),
            SessionPhase::WaitingForEnabledStreams
        );
    }

    #[test]
    fn test_exit_from_any_active_phase_succeeds() {
        let exit = Trigger::Interrupted(SessionInterrupt::UserExitRequested);
        for phase in [
            SessionPhase::WaitingForEnabledStreams,
            SessionPhase::Starting,
            SessionPhase::Streaming,
            SessionPhase::WaitingForUserAction,
        ] {
            assert_eq!(
                transition(phase, exit, true),
                SessionPhase::Exiting {
                    status: ExitStatus::Success
                }
            );
        }
    }

    #[test]
    fn test_exiting_is_terminal() {
        let phase = SessionPhase::Exiting {
            status: ExitStatus::Failure,
        };
        assert_eq!(pending_trigger(&phase, &quiet()), None);
        assert_eq!(transition(phase, Trigger::StreamsEnabled, false), phase);
    }

    #[test]
    fn test_invalid_transition_is_noop() {
        assert_eq!(
            transition(SessionPhase::WaitingForEnabledStreams, Trigger::Ready, false),
            SessionPhase::WaitingForEnabledStreams
        );
    }
}
