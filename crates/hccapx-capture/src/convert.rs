//! Offline conversion: capture file in, one HCCAPX record out.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;

use hccapx_logging::targets::T_CAPTURE;

use crate::eapol;
use crate::engine::{CaptureOptions, CaptureStats, HandshakeCapture};
use crate::error::Result;
use crate::frames::{DataFrame, MacAddress};
use crate::pcap::{self, CapturedFrame};
use crate::record::{HccapxRecord, RecordSummary};

/// What to extract from a capture
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    pub essid: Vec<u8>,
    /// Lock to this network; otherwise the first EAPOL frame's BSSID is used
    pub bssid: Option<MacAddress>,
    pub options: CaptureOptions,
}

/// Engine outcome for one EAPOL frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameEvent {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Rejection class, see [`crate::error::CaptureReject::kind`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertReport {
    pub frames_read: usize,
    pub data_frames: usize,
    pub eapol_frames: usize,
    /// EAPOL frames from other networks
    pub filtered: usize,
    pub bssid: Option<String>,
    pub events: Vec<FrameEvent>,
    pub stats: CaptureStats,
    pub record: Option<RecordSummary>,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub report: ConvertReport,
    pub record: Option<HccapxRecord>,
}

/// Read a legacy pcap file and run it through a fresh engine
pub fn convert_file(path: &Path, request: &ConvertRequest) -> Result<Conversion> {
    let file = File::open(path)?;
    let frames = pcap::read_frames(BufReader::new(file))?;
    tracing::info!(
        target: T_CAPTURE,
        path = %path.display(),
        frames = frames.len(),
        "Loaded capture"
    );
    convert_frames(&frames, request)
}

/// Feed every EAPOL data frame for one network to a single engine
pub fn convert_frames(frames: &[CapturedFrame], request: &ConvertRequest) -> Result<Conversion> {
    let mut capture = HandshakeCapture::with_options(request.options);
    capture.start_target(&request.essid)?;

    let mut bssid = request.bssid;
    let mut report = ConvertReport {
        frames_read: frames.len(),
        data_frames: 0,
        eapol_frames: 0,
        filtered: 0,
        bssid: None,
        events: Vec::new(),
        stats: CaptureStats::default(),
        record: None,
    };

    for captured in frames {
        let frame = match DataFrame::parse(&captured.data) {
            Ok(frame) => frame,
            Err(_) => continue,
        };
        report.data_frames += 1;

        if !eapol::is_eapol_payload(frame.payload) {
            continue;
        }
        report.eapol_frames += 1;

        match bssid {
            Some(locked) if locked != frame.bssid => {
                report.filtered += 1;
                continue;
            }
            Some(_) => {}
            None => {
                tracing::info!(target: T_CAPTURE, bssid = %frame.bssid, "Locking to network");
                bssid = Some(frame.bssid);
            }
        }

        let was_complete = capture.is_complete();
        let event = match capture.process_frame(&frame) {
            Ok(message) => FrameEvent {
                index: captured.index,
                message: Some(message.to_string()),
                reject_kind: None,
                rejected: None,
            },
            Err(reject) => FrameEvent {
                index: captured.index,
                message: None,
                reject_kind: Some(reject.kind()),
                rejected: Some(reject.to_string()),
            },
        };
        if !was_complete && capture.is_complete() {
            tracing::info!(
                target: T_CAPTURE,
                index = captured.index,
                "Handshake captured!"
            );
        }
        report.events.push(event);
    }

    report.bssid = bssid.map(|mac| mac.to_string());
    report.stats = capture.stats().clone();
    let record = capture.record().cloned();
    report.record = record.as_ref().map(HccapxRecord::summary);

    if record.is_none() {
        tracing::warn!(
            target: T_CAPTURE,
            eapol = report.eapol_frames,
            "No usable handshake in capture"
        );
    }

    Ok(Conversion { report, record })
}
