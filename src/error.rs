use libc::pid_t;
use thiserror::Error;

/// The three error kinds this crate ever produces.
///
/// `TraceeVanished` is recoverable: the caller abandons the current event and
/// marks the task `FREE`. `Sink` and `Invariant` propagate to the outer
/// attach/wait loop, which tears the tracer down.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tracee {tid} vanished while reading its memory")]
    TraceeVanished { tid: pid_t },

    #[error("event sink rejected an event: {0}")]
    Sink(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
