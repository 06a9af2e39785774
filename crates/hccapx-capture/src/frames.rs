//! 802.11 frame structures and types
//!
//! Just enough of the IEEE 802.11 MAC header to pull the three addresses and
//! the payload out of a captured data frame.

use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{HccapxError, Result};

/// MAC address (6 bytes)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Zero/null address, used as "not yet observed"
    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    /// Create from slice (must be 6 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; 6] = slice.try_into().map_err(|_| {
            HccapxError::InvalidMac(format!("Expected 6 bytes, got {}", slice.len()))
        })?;
        Ok(Self(bytes))
    }

    /// All six octets zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 6]
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = HccapxError;

    /// Accepts `AA:BB:CC:DD:EE:FF` or `aa-bb-cc-dd-ee-ff`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(|c: char| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(HccapxError::InvalidMac(format!(
                "Expected 6 octets separated by ':', got '{}'",
                s
            )));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| HccapxError::InvalidMac(format!("Invalid hex octet: '{}'", part)))?;
        }

        Ok(Self(bytes))
    }
}

/// 802.11 Frame Type (2 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Management frames (beacons, probes, auth, deauth, etc.)
    Management = 0,
    /// Control frames (ACK, RTS, CTS, etc.)
    Control = 1,
    /// Data frames (actual payload)
    Data = 2,
    /// Extension (802.11ad)
    Extension = 3,
}

impl FrameType {
    /// Parse from frame control field
    pub fn from_frame_control(fc: u16) -> Self {
        match (fc >> 2) & 0x03 {
            0 => Self::Management,
            1 => Self::Control,
            2 => Self::Data,
            _ => Self::Extension,
        }
    }
}

/// 802.11 Frame Control field (2 bytes, little endian on air)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    raw: u16,
}

impl FrameControl {
    /// Data frame, no DS bits
    pub const DATA: FrameControl = FrameControl { raw: 0x0008 };
    /// QoS data frame, no DS bits
    pub const QOS_DATA: FrameControl = FrameControl { raw: 0x0088 };

    pub fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// Get frame type
    pub fn frame_type(&self) -> FrameType {
        FrameType::from_frame_control(self.raw)
    }

    /// Raw 4-bit subtype
    pub fn subtype(&self) -> u8 {
        ((self.raw >> 4) & 0x0F) as u8
    }

    /// Data subtypes 8..15 carry a 2-byte QoS control field
    pub fn is_qos_data(&self) -> bool {
        self.frame_type() == FrameType::Data && self.subtype() & 0x08 != 0
    }

    pub fn to_ds(&self) -> bool {
        self.raw & 0x0100 != 0
    }

    pub fn from_ds(&self) -> bool {
        self.raw & 0x0200 != 0
    }

    /// +HTC/Order bit
    pub fn order(&self) -> bool {
        self.raw & 0x8000 != 0
    }

    /// Get raw value
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// MAC header length implied by these flags
    pub fn header_len(&self) -> usize {
        let mut len = DataFrame::BASE_HEADER_LEN;
        if self.to_ds() && self.from_ds() {
            len += 6; // Address 4
        }
        if self.is_qos_data() {
            len += 2;
            if self.order() {
                len += 4; // HT control
            }
        }
        len
    }
}

/// Decoded 802.11 data frame: the three header addresses and the MSDU payload.
///
/// Address 1 is the receiver/destination, address 2 the transmitter/source and
/// address 3 the BSSID (three-address convention, no WDS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataFrame<'a> {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub bssid: MacAddress,
    pub payload: &'a [u8],
}

impl<'a> DataFrame<'a> {
    /// FC + duration + 3 addresses + sequence control
    pub const BASE_HEADER_LEN: usize = 24;

    pub fn new(
        destination: MacAddress,
        source: MacAddress,
        bssid: MacAddress,
        payload: &'a [u8],
    ) -> Self {
        Self {
            destination,
            source,
            bssid,
            payload,
        }
    }

    /// Parse from raw 802.11 bytes (radiotap already stripped)
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::BASE_HEADER_LEN {
            return Err(HccapxError::invalid_frame(format!(
                "Frame too short: {} bytes",
                data.len()
            )));
        }

        let fc = FrameControl::new(LittleEndian::read_u16(&data[0..2]));
        if fc.frame_type() != FrameType::Data {
            return Err(HccapxError::invalid_frame(format!(
                "Not a data frame: {:?}",
                fc.frame_type()
            )));
        }

        let header_len = fc.header_len();
        if data.len() < header_len {
            return Err(HccapxError::invalid_frame(format!(
                "Header needs {} bytes, frame has {}",
                header_len,
                data.len()
            )));
        }

        Ok(Self {
            destination: MacAddress::from_slice(&data[4..10])?,
            source: MacAddress::from_slice(&data[10..16])?,
            bssid: MacAddress::from_slice(&data[16..22])?,
            payload: &data[header_len..],
        })
    }

    /// Serialize as a plain (non-QoS) data frame, mostly for building test captures
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::BASE_HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&FrameControl::DATA.raw().to_le_bytes());
        bytes.extend_from_slice(&[0x3A, 0x01]); // duration
        bytes.extend_from_slice(&self.destination.0);
        bytes.extend_from_slice(&self.source.0);
        bytes.extend_from_slice(&self.bssid.0);
        bytes.extend_from_slice(&[0x00, 0x00]); // sequence control
        bytes.extend_from_slice(self.payload);
        bytes
    }
}
