//! Radiotap header handling for monitor-mode captures
//!
//! Radiotap is the de-facto standard header prepended to 802.11 frames when
//! capturing in monitor mode. The engine only needs it gone.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{HccapxError, Result};

/// Minimal radiotap header (8 bytes, no fields present)
pub const MINIMAL_HEADER: [u8; 8] = [
    0x00, // Header revision
    0x00, // Header pad
    0x08, 0x00, // Header length (8 bytes, LE)
    0x00, 0x00, 0x00, 0x00, // Present flags (none)
];

/// Length of the radiotap header at the start of `data`
pub fn header_len(data: &[u8]) -> Result<usize> {
    if data.len() < 4 {
        return Err(HccapxError::invalid_frame("Radiotap header too short"));
    }

    if data[0] != 0 {
        return Err(HccapxError::invalid_frame(format!(
            "Unknown radiotap version: {}",
            data[0]
        )));
    }

    let len = LittleEndian::read_u16(&data[2..4]) as usize;
    if len < 8 || data.len() < len {
        return Err(HccapxError::invalid_frame(format!(
            "Radiotap header length {} invalid for data length {}",
            len,
            data.len()
        )));
    }

    Ok(len)
}

/// The 802.11 frame following the radiotap header
pub fn strip(data: &[u8]) -> Result<&[u8]> {
    let len = header_len(data)?;
    Ok(&data[len..])
}
