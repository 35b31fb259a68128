//! Error types for rs-pluto operations.

use thiserror::Error;

/// Result type for rs-pluto operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving an AD936x transceiver.
///
/// Every failure mode is a distinguishable, caller-visible outcome; none of
/// them are used for normal control flow.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested value is outside the supported range. Rejected before any
    /// device write, so it is safe to retry with a corrected value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An attribute read/write or buffer fetch against the device failed.
    /// Not retried internally; the device may be left partially configured
    /// and should be re-queried before the operation is attempted again.
    #[error("device communication failed: {0}")]
    DeviceCommunication(String),

    /// Data returned by the device violates a structural invariant
    /// (sample-buffer parity, malformed path-rate readback, unknown
    /// gain-mode string).
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),
}

impl Error {
    /// Create an `InvalidParameter` error with a custom message.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Create a `DeviceCommunication` error with a custom message.
    pub fn device<S: Into<String>>(msg: S) -> Self {
        Error::DeviceCommunication(msg.into())
    }

    /// Create a `DataIntegrity` error with a custom message.
    pub fn data<S: Into<String>>(msg: S) -> Self {
        Error::DataIntegrity(msg.into())
    }
}

#[cfg(feature = "iio")]
impl From<industrial_io::Error> for Error {
    fn from(err: industrial_io::Error) -> Self {
        Error::DeviceCommunication(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = Error::invalid_parameter("rate too low");
        assert_eq!(err.to_string(), "invalid parameter: rate too low");
    }

    #[test]
    fn test_device_error_display() {
        let err = Error::device("attribute write refused");
        assert!(err.to_string().contains("device communication failed"));
    }

    #[test]
    fn test_data_integrity_display() {
        let err = Error::data("odd sample count");
        assert!(err.to_string().contains("data integrity violation"));
    }
}
