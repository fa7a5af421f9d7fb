//! Session control loop and the state it shares with capture callbacks.

pub mod config;
mod controller;
pub mod correction;
mod delegate;
pub mod errors;
mod handle;
pub mod rate;
pub mod samples;
mod shared_state;
pub mod state;

pub use config::{AppConfig, StreamingConfig, StreamingSource};
pub use controller::SessionController;
pub use delegate::SessionDelegate;
pub use errors::{EndReason, SessionInterrupt};
pub use handle::{Presenter, SessionHandle};
pub use samples::{ModalitySlot, SampleAggregator, SampleSet};
pub use shared_state::{Observation, SessionContext, SharedSessionState, WriterHandle};
pub use state::{ExitStatus, SessionPhase, Trigger};
