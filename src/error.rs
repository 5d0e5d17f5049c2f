//! Error types for Marga

use thiserror::Error;

/// Marga error type
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    /// A control was driven in a way its contract forbids.
    #[error("Control contract violated: {0}")]
    Contract(String),

    #[error(
        "Arc exceeds motor speed: speed {speed:.3} m/s + omega {omega:.3} rad/s gives outer wheel {wheel_speed:.3} m/s (max {max_speed:.3})"
    )]
    ArcSpeed {
        speed: f64,
        omega: f64,
        wheel_speed: f64,
        max_speed: f64,
    },

    #[error("Control sequence produced no controls")]
    EmptySequence,

    #[error("Mission already in progress: {0}")]
    MissionInProgress(String),

    #[error("Undefined mission: {0}")]
    UnknownMission(String),
}

impl From<toml::de::Error> for MargaError {
    fn from(e: toml::de::Error) -> Self {
        MargaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
