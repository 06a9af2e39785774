//! EAPOL and EAPOL-Key decoding
//!
//! Turns the payload of an 802.11 data frame into the two views the capture
//! engine works on: the raw EAPOL packet (header + body, exactly as long as the
//! header claims) and the parsed key descriptor.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{HccapxError, Result};
use crate::frames::DataFrame;

/// LLC/SNAP header announcing EAPOL (ethertype 0x888E)
pub const LLC_SNAP_EAPOL: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

/// Version, type, body length
pub const EAPOL_HEADER_LEN: usize = 4;

/// Key descriptor up to and including the key data length field
pub const KEY_DESCRIPTOR_LEN: usize = 95;

/// Offsets within the key descriptor
pub const KEY_NONCE_OFFSET: usize = 13;
pub const KEY_MIC_OFFSET: usize = 77;
pub const KEY_DATA_LEN_OFFSET: usize = 93;

/// Where the MIC sits inside a captured EAPOL packet (header included)
pub const EAPOL_MIC_OFFSET: usize = EAPOL_HEADER_LEN + KEY_MIC_OFFSET;

/// EAPOL packet type carrying a key descriptor
pub const EAPOL_TYPE_KEY: u8 = 3;

/// Fixed EAPOL header; `body_length` is already in host order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EapolHeader {
    pub version: u8,
    pub packet_type: u8,
    pub body_length: u16,
}

/// An EAPOL packet borrowed from a frame payload.
///
/// `bytes` covers the header and exactly `body_length` body bytes; trailing
/// padding or FCS in the frame is not included.
#[derive(Debug, Clone, Copy)]
pub struct EapolPacket<'a> {
    pub header: EapolHeader,
    bytes: &'a [u8],
}

impl<'a> EapolPacket<'a> {
    /// Parse an EAPOL packet starting at `data[0]`
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < EAPOL_HEADER_LEN {
            return Err(HccapxError::invalid_frame("EAPOL header truncated"));
        }

        let header = EapolHeader {
            version: data[0],
            packet_type: data[1],
            body_length: BigEndian::read_u16(&data[2..4]),
        };

        let total = EAPOL_HEADER_LEN + header.body_length as usize;
        if data.len() < total {
            return Err(HccapxError::invalid_frame(format!(
                "EAPOL body truncated: header claims {} bytes, have {}",
                total,
                data.len()
            )));
        }

        Ok(Self {
            header,
            bytes: &data[..total],
        })
    }

    /// Parse from an 802.11 data payload that starts with LLC/SNAP
    pub fn from_payload(payload: &'a [u8]) -> Result<Self> {
        if !is_eapol_payload(payload) {
            return Err(HccapxError::invalid_frame("Payload is not LLC/SNAP EAPOL"));
        }
        Self::parse(&payload[LLC_SNAP_EAPOL.len()..])
    }

    /// Header length plus body length
    pub fn total_len(&self) -> usize {
        self.bytes.len()
    }

    /// Header and body
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn body(&self) -> &'a [u8] {
        &self.bytes[EAPOL_HEADER_LEN..]
    }
}

/// WPA Key Information flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    raw: u16,
}

impl KeyInfo {
    /// Parse from raw u16
    pub fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// Install flag
    pub fn install(&self) -> bool {
        (self.raw & 0x0040) != 0
    }

    /// ACK flag (set by AP in messages 1 and 3)
    pub fn ack(&self) -> bool {
        (self.raw & 0x0080) != 0
    }

    /// MIC flag (set when MIC is present)
    pub fn mic(&self) -> bool {
        (self.raw & 0x0100) != 0
    }

    /// Secure flag
    pub fn secure(&self) -> bool {
        (self.raw & 0x0200) != 0
    }
}

/// Parsed EAPOL-Key descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapolKeyPacket {
    pub descriptor_type: u8,
    pub key_info: KeyInfo,
    pub key_length: u16,
    pub replay_counter: u64,
    pub key_nonce: [u8; 32],
    pub key_mic: [u8; 16],
    pub key_data_length: u16,
}

impl EapolKeyPacket {
    /// Parse the key descriptor carried in `packet`'s body
    pub fn parse(packet: &EapolPacket<'_>) -> Result<Self> {
        if packet.header.packet_type != EAPOL_TYPE_KEY {
            return Err(HccapxError::invalid_frame(format!(
                "EAPOL packet type {} is not Key",
                packet.header.packet_type
            )));
        }

        let body = packet.body();
        if body.len() < KEY_DESCRIPTOR_LEN {
            return Err(HccapxError::invalid_frame(format!(
                "EAPOL-Key body too short: {} bytes",
                body.len()
            )));
        }

        let mut key_nonce = [0u8; 32];
        key_nonce.copy_from_slice(&body[KEY_NONCE_OFFSET..KEY_NONCE_OFFSET + 32]);

        let mut key_mic = [0u8; 16];
        key_mic.copy_from_slice(&body[KEY_MIC_OFFSET..KEY_MIC_OFFSET + 16]);

        Ok(Self {
            descriptor_type: body[0],
            key_info: KeyInfo::new(BigEndian::read_u16(&body[1..3])),
            key_length: BigEndian::read_u16(&body[3..5]),
            replay_counter: BigEndian::read_u64(&body[5..13]),
            key_nonce,
            key_mic,
            key_data_length: BigEndian::read_u16(&body[KEY_DATA_LEN_OFFSET..KEY_DATA_LEN_OFFSET + 2]),
        })
    }

    /// M1 is the only message without a MIC
    pub fn mic_is_empty(&self) -> bool {
        self.key_mic.iter().all(|&b| b == 0)
    }

    /// M4 leaves the nonce empty; only the leading 16 bytes are checked
    pub fn nonce_is_empty(&self) -> bool {
        self.key_nonce[..16].iter().all(|&b| b == 0)
    }
}

/// Payload starts with the EAPOL LLC/SNAP header
pub fn is_eapol_payload(payload: &[u8]) -> bool {
    payload.len() >= LLC_SNAP_EAPOL.len() && payload[..LLC_SNAP_EAPOL.len()] == LLC_SNAP_EAPOL
}

/// Decode both views from a data frame
pub fn decode<'a>(frame: &DataFrame<'a>) -> Result<(EapolPacket<'a>, EapolKeyPacket)> {
    let packet = EapolPacket::from_payload(frame.payload)?;
    let key = EapolKeyPacket::parse(&packet)?;
    Ok((packet, key))
}
