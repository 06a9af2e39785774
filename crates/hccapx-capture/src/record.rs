//! HCCAPX record layout
//!
//! One record is 393 packed little-endian bytes, the format hashcat reads for
//! WPA/WPA2 handshakes. The engine fills a record in place; `to_bytes` is the
//! wire contract with the cracker.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::eapol::{EapolKeyPacket, EapolPacket, EAPOL_MIC_OFFSET};
use crate::error::{CaptureReject, HccapxError, Result};
use crate::frames::MacAddress;

pub const HCCAPX_SIGNATURE: u32 = 0x5850_4348; // "HCPX"
pub const HCCAPX_VERSION: u32 = 4;
pub const HCCAPX_KEYVER_WPA2: u8 = 2;
pub const HCCAPX_MAX_EAPOL_SIZE: usize = 256;
pub const HCCAPX_MAX_ESSID_LEN: usize = 32;
/// `message_pair` value while no usable pairing exists
pub const HCCAPX_INCOMPLETE: u8 = 255;
pub const HCCAPX_RECORD_SIZE: usize = 393;

mod offset {
    pub const SIGNATURE: usize = 0;
    pub const VERSION: usize = 4;
    pub const MESSAGE_PAIR: usize = 8;
    pub const ESSID_LEN: usize = 9;
    pub const ESSID: usize = 10;
    pub const KEYVER: usize = 42;
    pub const KEYMIC: usize = 43;
    pub const MAC_AP: usize = 59;
    pub const NONCE_AP: usize = 65;
    pub const MAC_STA: usize = 97;
    pub const NONCE_STA: usize = 103;
    pub const EAPOL_LEN: usize = 135;
    pub const EAPOL: usize = 137;
}

/// Which two handshake messages a record combines.
///
/// The name reads "messages X and Y, EAPOL taken from Z". The cracker uses it
/// to decide which nonce corrections to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum MessagePair {
    /// ANonce from M1, EAPOL from M2
    M12E2 = 0,
    /// ANonce from M1, EAPOL from M4
    M14E4 = 1,
    /// ANonce from M3, EAPOL from M2
    M32E2 = 2,
    /// ANonce from M3, EAPOL from M3
    M32E3 = 3,
    /// ANonce from M3, EAPOL from M3 (confirmed by M4)
    M34E3 = 4,
    /// ANonce from M3, EAPOL from M4
    M34E4 = 5,
}

impl MessagePair {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Exact code only; bytes with hashcat's upper flag bits set are not a
    /// pair this crate can write back unchanged
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::M12E2),
            1 => Some(Self::M14E4),
            2 => Some(Self::M32E2),
            3 => Some(Self::M32E3),
            4 => Some(Self::M34E3),
            5 => Some(Self::M34E4),
            _ => None,
        }
    }
}

impl fmt::Display for MessagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// A single HCCAPX record
#[derive(Clone, PartialEq, Eq)]
pub struct HccapxRecord {
    pub signature: u32,
    pub version: u32,
    /// `None` serializes as [`HCCAPX_INCOMPLETE`]
    pub message_pair: Option<MessagePair>,
    pub essid_len: u8,
    pub essid: [u8; HCCAPX_MAX_ESSID_LEN],
    pub keyver: u8,
    pub keymic: [u8; 16],
    pub mac_ap: MacAddress,
    pub nonce_ap: [u8; 32],
    pub mac_sta: MacAddress,
    pub nonce_sta: [u8; 32],
    pub eapol_len: u16,
    pub eapol: [u8; HCCAPX_MAX_EAPOL_SIZE],
}

impl Default for HccapxRecord {
    fn default() -> Self {
        Self {
            signature: HCCAPX_SIGNATURE,
            version: HCCAPX_VERSION,
            message_pair: None,
            essid_len: 0,
            essid: [0u8; HCCAPX_MAX_ESSID_LEN],
            keyver: HCCAPX_KEYVER_WPA2,
            keymic: [0u8; 16],
            mac_ap: MacAddress::ZERO,
            nonce_ap: [0u8; 32],
            mac_sta: MacAddress::ZERO,
            nonce_sta: [0u8; 32],
            eapol_len: 0,
            eapol: [0u8; HCCAPX_MAX_EAPOL_SIZE],
        }
    }
}

impl HccapxRecord {
    /// Empty record for `essid`
    pub fn new(essid: &[u8]) -> Result<Self> {
        let mut record = Self::default();
        record.set_essid(essid)?;
        Ok(record)
    }

    pub fn set_essid(&mut self, essid: &[u8]) -> Result<()> {
        if essid.len() > HCCAPX_MAX_ESSID_LEN {
            return Err(HccapxError::EssidTooLong {
                len: essid.len(),
                max: HCCAPX_MAX_ESSID_LEN,
            });
        }
        self.essid = [0u8; HCCAPX_MAX_ESSID_LEN];
        self.essid[..essid.len()].copy_from_slice(essid);
        self.essid_len = essid.len() as u8;
        Ok(())
    }

    pub fn essid(&self) -> &[u8] {
        &self.essid[..self.essid_len as usize]
    }

    /// The buffered EAPOL packet, MIC already zeroed
    pub fn eapol(&self) -> &[u8] {
        &self.eapol[..self.eapol_len as usize]
    }

    pub fn is_complete(&self) -> bool {
        self.message_pair.is_some()
    }

    /// Copy `packet` into the EAPOL buffer and blank its MIC.
    ///
    /// The true MIC goes to `keymic`; the copy has the same 16 bytes zeroed so
    /// the cracker can recompute the MIC over it. On overflow nothing changes.
    pub fn capture_eapol(
        &mut self,
        packet: &EapolPacket<'_>,
        key: &EapolKeyPacket,
    ) -> std::result::Result<(), CaptureReject> {
        let len = packet.total_len();
        if len > HCCAPX_MAX_EAPOL_SIZE {
            return Err(CaptureReject::Overflow {
                len,
                capacity: HCCAPX_MAX_EAPOL_SIZE,
            });
        }

        self.eapol = [0u8; HCCAPX_MAX_EAPOL_SIZE];
        self.eapol[..len].copy_from_slice(packet.as_bytes());
        self.eapol_len = len as u16;
        self.keymic = key.key_mic;
        self.eapol[EAPOL_MIC_OFFSET..EAPOL_MIC_OFFSET + 16].fill(0);
        Ok(())
    }

    /// Serialize to the packed on-disk layout
    pub fn to_bytes(&self) -> [u8; HCCAPX_RECORD_SIZE] {
        let mut buf = [0u8; HCCAPX_RECORD_SIZE];
        LittleEndian::write_u32(&mut buf[offset::SIGNATURE..], self.signature);
        LittleEndian::write_u32(&mut buf[offset::VERSION..], self.version);
        buf[offset::MESSAGE_PAIR] = self
            .message_pair
            .map(MessagePair::code)
            .unwrap_or(HCCAPX_INCOMPLETE);
        buf[offset::ESSID_LEN] = self.essid_len;
        buf[offset::ESSID..offset::ESSID + HCCAPX_MAX_ESSID_LEN].copy_from_slice(&self.essid);
        buf[offset::KEYVER] = self.keyver;
        buf[offset::KEYMIC..offset::KEYMIC + 16].copy_from_slice(&self.keymic);
        buf[offset::MAC_AP..offset::MAC_AP + 6].copy_from_slice(&self.mac_ap.0);
        buf[offset::NONCE_AP..offset::NONCE_AP + 32].copy_from_slice(&self.nonce_ap);
        buf[offset::MAC_STA..offset::MAC_STA + 6].copy_from_slice(&self.mac_sta.0);
        buf[offset::NONCE_STA..offset::NONCE_STA + 32].copy_from_slice(&self.nonce_sta);
        LittleEndian::write_u16(&mut buf[offset::EAPOL_LEN..], self.eapol_len);
        buf[offset::EAPOL..].copy_from_slice(&self.eapol);
        buf
    }

    /// Parse one record from the front of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HCCAPX_RECORD_SIZE {
            return Err(HccapxError::invalid_record(format!(
                "Expected {} bytes, got {}",
                HCCAPX_RECORD_SIZE,
                data.len()
            )));
        }

        let signature = LittleEndian::read_u32(&data[offset::SIGNATURE..]);
        if signature != HCCAPX_SIGNATURE {
            return Err(HccapxError::invalid_record(format!(
                "Bad signature {:#010x}",
                signature
            )));
        }

        let essid_len = data[offset::ESSID_LEN];
        if essid_len as usize > HCCAPX_MAX_ESSID_LEN {
            return Err(HccapxError::invalid_record(format!(
                "ESSID length {} exceeds {}",
                essid_len, HCCAPX_MAX_ESSID_LEN
            )));
        }

        let eapol_len = LittleEndian::read_u16(&data[offset::EAPOL_LEN..]);
        if eapol_len as usize > HCCAPX_MAX_EAPOL_SIZE {
            return Err(HccapxError::invalid_record(format!(
                "EAPOL length {} exceeds {}",
                eapol_len, HCCAPX_MAX_EAPOL_SIZE
            )));
        }

        let pair_code = data[offset::MESSAGE_PAIR];
        let message_pair = if pair_code == HCCAPX_INCOMPLETE {
            None
        } else {
            Some(MessagePair::from_code(pair_code).ok_or_else(|| {
                HccapxError::invalid_record(format!("Unknown message pair {}", pair_code))
            })?)
        };

        let mut record = Self {
            signature,
            version: LittleEndian::read_u32(&data[offset::VERSION..]),
            message_pair,
            essid_len,
            keyver: data[offset::KEYVER],
            mac_ap: MacAddress::from_slice(&data[offset::MAC_AP..offset::MAC_AP + 6])?,
            mac_sta: MacAddress::from_slice(&data[offset::MAC_STA..offset::MAC_STA + 6])?,
            eapol_len,
            ..Self::default()
        };
        record
            .essid
            .copy_from_slice(&data[offset::ESSID..offset::ESSID + HCCAPX_MAX_ESSID_LEN]);
        record
            .keymic
            .copy_from_slice(&data[offset::KEYMIC..offset::KEYMIC + 16]);
        record
            .nonce_ap
            .copy_from_slice(&data[offset::NONCE_AP..offset::NONCE_AP + 32]);
        record
            .nonce_sta
            .copy_from_slice(&data[offset::NONCE_STA..offset::NONCE_STA + 32]);
        record
            .eapol
            .copy_from_slice(&data[offset::EAPOL..offset::EAPOL + HCCAPX_MAX_EAPOL_SIZE]);
        Ok(record)
    }

    /// Convert to hashcat format (22000).
    ///
    /// Format: `WPA*02*MIC*MAC_AP*MAC_STA*ESSID*ANONCE*EAPOL*MESSAGEPAIR`
    pub fn to_hashcat_22000(&self) -> Option<String> {
        let pair = self.message_pair?;
        Some(format!(
            "WPA*02*{}*{}*{}*{}*{}*{}*{:02x}",
            hex_string(&self.keymic),
            hex_string(&self.mac_ap.0),
            hex_string(&self.mac_sta.0),
            hex_string(self.essid()),
            hex_string(&self.nonce_ap),
            hex_string(self.eapol()),
            pair.code()
        ))
    }

    /// JSON-friendly view for reports
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            essid: String::from_utf8_lossy(self.essid()).into_owned(),
            message_pair: self.message_pair,
            keyver: self.keyver,
            mac_ap: self.mac_ap.to_string(),
            mac_sta: self.mac_sta.to_string(),
            nonce_ap: hex_string(&self.nonce_ap),
            nonce_sta: hex_string(&self.nonce_sta),
            keymic: hex_string(&self.keymic),
            eapol_len: self.eapol_len,
            hashcat_22000: self.to_hashcat_22000(),
        }
    }
}

impl fmt::Debug for HccapxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HccapxRecord")
            .field("message_pair", &self.message_pair)
            .field("essid", &String::from_utf8_lossy(self.essid()))
            .field("mac_ap", &self.mac_ap)
            .field("mac_sta", &self.mac_sta)
            .field("eapol_len", &self.eapol_len)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub essid: String,
    pub message_pair: Option<MessagePair>,
    pub keyver: u8,
    pub mac_ap: String,
    pub mac_sta: String,
    pub nonce_ap: String,
    pub nonce_sta: String,
    pub keymic: String,
    pub eapol_len: u16,
    pub hashcat_22000: Option<String>,
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
