use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("transport read timeout")]
    Timeout,
    #[error("link closed before a full reply line arrived")]
    UnexpectedEof,
    #[error("reply is not valid UTF-8")]
    Encoding,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
