//! Error types for hccapx-capture

use thiserror::Error;

use crate::engine::FrameRole;
use crate::frames::MacAddress;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, HccapxError>;

/// Main error type for decoding, record handling and I/O
#[derive(Error, Debug)]
pub enum HccapxError {
    /// Invalid or truncated 802.11/EAPOL data
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Invalid MAC address
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    /// Network name does not fit the record
    #[error("ESSID too long: {len} bytes (max {max})")]
    EssidTooLong { len: usize, max: usize },

    /// Record bytes do not follow the HCCAPX layout
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Capture file could not be parsed
    #[error("Pcap error: {0}")]
    Pcap(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HccapxError {
    /// Create an invalid frame error
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    /// Create an invalid record error
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }
}

/// Why the engine dropped a frame.
///
/// Every variant is local to the frame and the next frame is processed
/// normally. Progress markers, nonces and the buffer are left as they were,
/// except for `Overflow`, where the progress marker and nonce of the message
/// still advance. A frame that passed the address checks has its address
/// recorded even when a later step rejects it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureReject {
    /// BSSID is neither the source nor the destination
    #[error("Unknown frame format. BSSID is not source nor destination")]
    UnknownRole,

    /// Address disagrees with the one recorded for this target
    #[error("Different {role}: expected {expected}, got {actual}")]
    AddressConflict {
        role: FrameRole,
        expected: MacAddress,
        actual: MacAddress,
    },

    /// Message does not fit the record's EAPOL buffer
    #[error("EAPoL is too long ({len}/{capacity})")]
    Overflow { len: usize, capacity: usize },

    /// M4 seen before any AP message
    #[error("Not enough handshake messages received")]
    InsufficientProgress,

    /// Payload is not a usable EAPOL-Key packet
    #[error("Not an EAPOL-Key frame: {0}")]
    Decode(String),
}

impl CaptureReject {
    /// Short label used for stats and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRole => "unknown_role",
            Self::AddressConflict { .. } => "address_conflict",
            Self::Overflow { .. } => "overflow",
            Self::InsufficientProgress => "insufficient_progress",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<HccapxError> for CaptureReject {
    fn from(err: HccapxError) -> Self {
        Self::Decode(err.to_string())
    }
}
