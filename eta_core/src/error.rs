use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EtaError {
    /// Fatal at construction: no producer, zero-area screen, bad parameters.
    #[error("configuration error: {0}")]
    Config(String),
    #[error("device error: {0}")]
    Device(String),
    /// A single sample could not be used; the stream continues.
    #[error("sample dropped: {0}")]
    Sample(String),
    /// A session artifact could not be read or written; capture continues.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Validation input was missing or unusable; yields an empty result.
    #[error("analysis input: {0}")]
    AnalysisInput(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing gaze source")]
    MissingSource,
    #[error("screen resolution must be non-zero")]
    ZeroScreen,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
