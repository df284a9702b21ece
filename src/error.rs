use derive_more::From;
use strum_macros::Display;
use thiserror::Error;

use crate::ack::WaitForAcksError;
use crate::protocol::MessageType;

/// Why a [`crate::CallContext`] stopped an operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum CancelReason {
    #[strum(to_string = "operation was cancelled")]
    Cancelled,
    #[strum(to_string = "deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned when a datagram or payload does not have the expected layout.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum MalformedMessage {
    /// The buffer is shorter than a fixed-size structure.
    #[error("message is too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    /// The header size field disagrees with the datagram length.
    #[error("message size mismatch: header declares {declared} bytes but datagram has {actual}")]
    SizeMismatch { declared: usize, actual: usize },
    /// The payload cannot be represented in the 16-bit size field.
    #[error("payload is too large: {payload_len} bytes exceeds max {max_payload_len}")]
    PayloadTooLarge {
        payload_len: usize,
        max_payload_len: usize,
    },
    /// A device chain reported an impossible tile range.
    #[error("device chain reports tiles {start}..{end}, beyond the {capacity} record slots")]
    TileRangeOutOfBounds {
        start: usize,
        end: usize,
        capacity: usize,
    },
}

/// Errors returned when loading product metadata.
#[derive(Debug, Error)]
pub enum ProductRegistryError {
    #[error("failed to parse products JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to read products file")]
    Io(#[from] std::io::Error),
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level error for device operations.
#[derive(Debug, Error, From)]
pub enum LifxError {
    #[error(transparent)]
    #[from(MalformedMessage)]
    Malformed(MalformedMessage),
    #[error(transparent)]
    #[from(WaitForAcksError, Box<WaitForAcksError>)]
    PartialAck(Box<WaitForAcksError>),
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("{0}")]
    #[from(CancelReason)]
    Cancelled(CancelReason),
    #[error("device does not handle message type {message_type}")]
    Unhandled { message_type: MessageType },
    #[error("service type {service} cannot be dialed")]
    UnsupportedService { service: u8 },
    #[error("device reported no tiles")]
    NoTiles,
    #[error("echo reply did not match the request payload")]
    EchoMismatch,
    #[error("network I/O failed")]
    #[from(std::io::Error)]
    Io(#[source] std::io::Error),
}

impl LifxError {
    /// Returns whether this error came from cancellation or a deadline,
    /// including cancellation that interrupted an ack wait.
    ///
    /// ```
    /// use lifxlan::{CancelReason, LifxError};
    ///
    /// assert!(LifxError::Cancelled(CancelReason::DeadlineExceeded).is_cancelled());
    /// assert!(!LifxError::NoTiles.is_cancelled());
    /// ```
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled(_) => true,
            Self::PartialAck(error) => error.cause().is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(
        LifxError::ShortWrite { written: 10, expected: 36 },
        "short write: wrote 10 of 36 bytes"
    )]
    #[case(
        LifxError::Cancelled(CancelReason::DeadlineExceeded),
        "deadline exceeded"
    )]
    #[case(
        LifxError::Unhandled { message_type: MessageType::GET_DEVICE_CHAIN },
        "device does not handle message type GetDeviceChain(701)"
    )]
    #[case(
        LifxError::from(MalformedMessage::SizeMismatch { declared: 40, actual: 38 }),
        "message size mismatch: header declares 40 bytes but datagram has 38"
    )]
    fn display_is_human_readable(#[case] error: LifxError, #[case] expected: &str) {
        assert_eq!(expected, error.to_string());
    }

    #[test]
    fn partial_ack_after_cancel_counts_as_cancelled() {
        let error = LifxError::from(WaitForAcksError::new(
            vec![1],
            vec![1, 2, 3],
            LifxError::Cancelled(CancelReason::Cancelled),
        ));
        assert!(error.is_cancelled());
    }
}
