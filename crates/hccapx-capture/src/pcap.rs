//! Legacy pcap frame source
//!
//! Reads captures taken in monitor mode (radiotap, linktype 127) or raw 802.11
//! (linktype 105) and yields the bare 802.11 frames.

use std::io::Read;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError};

use crate::error::{HccapxError, Result};
use crate::radiotap;

use hccapx_logging::targets::T_CAPTURE;

const READ_BUFFER_SIZE: usize = 65536;

const LINKTYPE_IEEE802_11: Linktype = Linktype(105);
const LINKTYPE_RADIOTAP: Linktype = Linktype(127);

/// One 802.11 frame from a capture file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// 1-based position in the file
    pub index: u64,
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// 802.11 frame, radiotap stripped
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkLayer {
    Radiotap,
    Ieee80211,
}

impl LinkLayer {
    fn from_linktype(linktype: Linktype) -> Result<Self> {
        if linktype == LINKTYPE_RADIOTAP {
            Ok(Self::Radiotap)
        } else if linktype == LINKTYPE_IEEE802_11 {
            Ok(Self::Ieee80211)
        } else {
            Err(HccapxError::Pcap(format!(
                "unsupported link type {} (need 802.11 or radiotap)",
                linktype.0
            )))
        }
    }
}

/// Read every 802.11 frame from a legacy pcap stream
pub fn read_frames<R: Read>(input: R) -> Result<Vec<CapturedFrame>> {
    let mut reader = LegacyPcapReader::new(READ_BUFFER_SIZE, input)
        .map_err(|e| HccapxError::Pcap(format!("not a valid legacy pcap file: {:?}", e)))?;

    let mut link: Option<LinkLayer> = None;
    let mut frames = Vec::new();
    let mut index: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(hdr) => {
                        link = Some(LinkLayer::from_linktype(hdr.network)?);
                    }
                    PcapBlockOwned::Legacy(pkt) => {
                        index += 1;
                        let layer = link.ok_or_else(|| {
                            HccapxError::Pcap("packet before global header".to_string())
                        })?;
                        let frame = match layer {
                            LinkLayer::Ieee80211 => Ok(pkt.data),
                            LinkLayer::Radiotap => radiotap::strip(pkt.data),
                        };
                        match frame {
                            Ok(data) => frames.push(CapturedFrame {
                                index,
                                ts_sec: pkt.ts_sec,
                                ts_usec: pkt.ts_usec,
                                data: data.to_vec(),
                            }),
                            Err(e) => {
                                skipped += 1;
                                tracing::trace!(target: T_CAPTURE, "Skipping packet {}: {}", index, e);
                            }
                        }
                    }
                    PcapBlockOwned::NG(_) => {
                        return Err(HccapxError::Pcap(
                            "pcapng block encountered, only legacy pcap supported".to_string(),
                        ));
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| HccapxError::Pcap(format!("refill error: {:?}", e)))?;
            }
            Err(e) => return Err(HccapxError::Pcap(format!("pcap parse error: {:?}", e))),
        }
    }

    tracing::debug!(
        target: T_CAPTURE,
        frames = frames.len(),
        skipped,
        "Read capture"
    );
    Ok(frames)
}
