use thiserror::Error;

/// Reply did not have the shape or content expected for the command sent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("reply to `{command}` did not match the expected schema after {attempts} attempt(s): {reply:?}")]
    SchemaMismatch {
        command: String,
        reply: String,
        attempts: u32,
    },
    #[error("malformed value {token:?} at token {index} in reply to `{command}`: {reply:?}")]
    Value {
        command: String,
        index: usize,
        token: String,
        reply: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    #[error("transport timed out waiting for a reply")]
    TransportTimeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("unrecognized ramp state: {0:?}")]
    RampState(String),
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
    #[error("ramp did not settle within {waited_ms} ms")]
    RampTimeout { waited_ms: u64 },
    #[error("operation cancelled")]
    Cancelled,
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
