use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("data rate must be > 0")]
    InvalidRate,
    #[error("invalid mock parameter: {0}")]
    InvalidParam(&'static str),
    #[error("could not start tracker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
