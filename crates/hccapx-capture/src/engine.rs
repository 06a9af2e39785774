//! WPA/WPA2 4-way handshake capture engine
//!
//! Feeds EAPOL-Key data frames for one target network through a small state
//! machine and fills an [`HccapxRecord`] as soon as two messages form a pair
//! the cracker can use. One engine per target; it performs no locking.
//!
//! Frame role comes from the three-address convention: a frame *from* the AP
//! carries the BSSID as its source, a frame *to* the AP carries it as its
//! destination. Within a role the message is told apart by field emptiness:
//! M1 has no MIC, M4 has no nonce.

use std::fmt;

use serde::Serialize;

use crate::eapol::{self, EapolKeyPacket, EapolPacket};
use crate::error::{CaptureReject, Result};
use crate::frames::{DataFrame, MacAddress};
use crate::record::{HccapxRecord, MessagePair};

use hccapx_logging::targets::T_HANDSHAKE;

/// Who sent a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameRole {
    /// Access point (source == BSSID)
    Ap,
    /// Station (destination == BSSID)
    Sta,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ap => f.write_str("AP"),
            Self::Sta => f.write_str("STA"),
        }
    }
}

/// Handshake message number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandshakeMessage {
    M1,
    M2,
    M3,
    M4,
}

impl HandshakeMessage {
    pub fn number(self) -> u8 {
        match self {
            Self::M1 => 1,
            Self::M2 => 2,
            Self::M3 => 3,
            Self::M4 => 4,
        }
    }
}

impl fmt::Display for HandshakeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.number())
    }
}

/// Latest AP message seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ApProgress {
    #[default]
    Unseen,
    M1Seen,
    M3Seen,
}

/// Station progress; M2 is sticky once seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StaProgress {
    #[default]
    Unseen,
    M2Seen,
    M4Seen,
}

/// Message whose bytes currently sit in the record's EAPOL buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EapolSource {
    #[default]
    None,
    M2,
    M3,
    M4,
}

/// Engine behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Take the ANonce from M3 when no M1 has been seen
    pub anonce_from_m3: bool,
}

/// Per-session counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub frames: u64,
    pub ap_frames: u64,
    pub sta_frames: u64,
    pub unknown_role: u64,
    pub address_conflicts: u64,
    pub overflows: u64,
    pub insufficient_progress: u64,
    pub decode_errors: u64,
    /// Frames classified after the record was already complete
    pub after_complete: u64,
}

impl CaptureStats {
    fn count_reject(&mut self, reject: &CaptureReject) {
        match reject {
            CaptureReject::UnknownRole => self.unknown_role += 1,
            CaptureReject::AddressConflict { .. } => self.address_conflicts += 1,
            CaptureReject::Overflow { .. } => self.overflows += 1,
            CaptureReject::InsufficientProgress => self.insufficient_progress += 1,
            CaptureReject::Decode(_) => self.decode_errors += 1,
        }
    }
}

/// Handshake capture session for one target network
#[derive(Debug, Clone)]
pub struct HandshakeCapture {
    record: HccapxRecord,
    ap_progress: ApProgress,
    sta_progress: StaProgress,
    eapol_source: EapolSource,
    options: CaptureOptions,
    stats: CaptureStats,
}

impl Default for HandshakeCapture {
    fn default() -> Self {
        Self::with_options(CaptureOptions::default())
    }
}

impl HandshakeCapture {
    /// Engine for `essid` with default options
    pub fn new(essid: &[u8]) -> Result<Self> {
        let mut capture = Self::default();
        capture.start_target(essid)?;
        Ok(capture)
    }

    /// Engine with no target set yet
    pub fn with_options(options: CaptureOptions) -> Self {
        Self {
            record: HccapxRecord::default(),
            ap_progress: ApProgress::Unseen,
            sta_progress: StaProgress::Unseen,
            eapol_source: EapolSource::None,
            options,
            stats: CaptureStats::default(),
        }
    }

    /// Start a new target: fresh record carrying `essid`, all progress cleared.
    ///
    /// Fails only when `essid` does not fit the record; the engine is left
    /// untouched in that case.
    pub fn start_target(&mut self, essid: &[u8]) -> Result<()> {
        let record = HccapxRecord::new(essid)?;
        *self = Self {
            record,
            ..Self::with_options(self.options)
        };
        tracing::debug!(
            target: T_HANDSHAKE,
            essid = %String::from_utf8_lossy(essid),
            "New handshake target"
        );
        Ok(())
    }

    /// The record, once a usable pairing exists
    pub fn record(&self) -> Option<&HccapxRecord> {
        if self.record.is_complete() {
            Some(&self.record)
        } else {
            None
        }
    }

    /// The record in whatever state it is in
    pub fn partial_record(&self) -> &HccapxRecord {
        &self.record
    }

    pub fn message_pair(&self) -> Option<MessagePair> {
        self.record.message_pair
    }

    pub fn is_complete(&self) -> bool {
        self.record.is_complete()
    }

    pub fn ap_progress(&self) -> ApProgress {
        self.ap_progress
    }

    pub fn sta_progress(&self) -> StaProgress {
        self.sta_progress
    }

    pub fn eapol_source(&self) -> EapolSource {
        self.eapol_source
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Process one EAPOL-Key data frame.
    ///
    /// Returns the message the frame was identified as, or why it was dropped.
    /// Rejections never leave the engine unusable.
    pub fn process_frame(
        &mut self,
        frame: &DataFrame<'_>,
    ) -> std::result::Result<HandshakeMessage, CaptureReject> {
        self.stats.frames += 1;
        let result = self.handle_frame(frame);
        if let Err(reject) = &result {
            self.stats.count_reject(reject);
        }
        result
    }

    fn handle_frame(
        &mut self,
        frame: &DataFrame<'_>,
    ) -> std::result::Result<HandshakeMessage, CaptureReject> {
        let role = classify(frame).map_err(|reject| {
            tracing::error!(target: T_HANDSHAKE, bssid = %frame.bssid, "{}", reject);
            reject
        })?;

        let (packet, key) = eapol::decode(frame).map_err(|err| {
            tracing::debug!(target: T_HANDSHAKE, "Dropping frame: {}", err);
            CaptureReject::from(err)
        })?;

        match role {
            FrameRole::Ap => self.stats.ap_frames += 1,
            FrameRole::Sta => self.stats.sta_frames += 1,
        }

        self.check_addresses(role, frame).map_err(|reject| {
            tracing::error!(target: T_HANDSHAKE, "{}", reject);
            reject
        })?;

        let message = identify(role, &key);
        tracing::debug!(
            target: T_HANDSHAKE,
            key_info = format_args!("{:#06x}", key.key_info.raw()),
            ack = key.key_info.ack(),
            mic = key.key_info.mic(),
            install = key.key_info.install(),
            secure = key.key_info.secure(),
            replay_counter = key.replay_counter,
            "From {} {}",
            role,
            message
        );

        if self.is_complete() {
            self.stats.after_complete += 1;
            tracing::trace!(target: T_HANDSHAKE, "Handshake already complete, ignoring {}", message);
            return Ok(message);
        }

        self.record_addresses(role, frame);
        self.advance(message, &packet, &key).map_err(|reject| {
            match reject {
                CaptureReject::Overflow { .. } => {
                    tracing::warn!(target: T_HANDSHAKE, "{} not buffered: {}", message, reject)
                }
                _ => tracing::error!(target: T_HANDSHAKE, "{}", reject),
            }
            reject
        })?;
        Ok(message)
    }

    /// Reject frames that disagree with addresses already recorded
    fn check_addresses(
        &self,
        role: FrameRole,
        frame: &DataFrame<'_>,
    ) -> std::result::Result<(), CaptureReject> {
        let (sta_addr, ap_addr) = match role {
            FrameRole::Ap => (frame.destination, frame.source),
            FrameRole::Sta => (frame.source, frame.bssid),
        };

        if !self.record.mac_sta.is_zero() && sta_addr != self.record.mac_sta {
            return Err(CaptureReject::AddressConflict {
                role: FrameRole::Sta,
                expected: self.record.mac_sta,
                actual: sta_addr,
            });
        }
        if !self.record.mac_ap.is_zero() && ap_addr != self.record.mac_ap {
            return Err(CaptureReject::AddressConflict {
                role: FrameRole::Ap,
                expected: self.record.mac_ap,
                actual: ap_addr,
            });
        }
        Ok(())
    }

    /// First AP frame fixes the AP address, first STA frame the station address
    fn record_addresses(&mut self, role: FrameRole, frame: &DataFrame<'_>) {
        match role {
            FrameRole::Ap if self.record.mac_ap.is_zero() => self.record.mac_ap = frame.source,
            FrameRole::Sta if self.record.mac_sta.is_zero() => self.record.mac_sta = frame.source,
            _ => {}
        }
    }

    fn advance(
        &mut self,
        message: HandshakeMessage,
        packet: &EapolPacket<'_>,
        key: &EapolKeyPacket,
    ) -> std::result::Result<(), CaptureReject> {
        match message {
            HandshakeMessage::M1 => {
                self.ap_progress = ApProgress::M1Seen;
                self.record.nonce_ap = key.key_nonce;
                Ok(())
            }
            HandshakeMessage::M3 => {
                if self.options.anonce_from_m3 && self.ap_progress == ApProgress::Unseen {
                    self.record.nonce_ap = key.key_nonce;
                }
                self.ap_progress = ApProgress::M3Seen;
                match self.eapol_source {
                    EapolSource::M2 => {
                        self.complete(MessagePair::M32E2);
                        Ok(())
                    }
                    EapolSource::None | EapolSource::M3 | EapolSource::M4 => {
                        self.buffer(packet, key, EapolSource::M3)?;
                        if self.sta_progress == StaProgress::M2Seen {
                            self.complete(MessagePair::M32E3);
                        }
                        Ok(())
                    }
                }
            }
            HandshakeMessage::M2 => {
                self.sta_progress = StaProgress::M2Seen;
                self.record.nonce_sta = key.key_nonce;
                self.buffer(packet, key, EapolSource::M2)?;
                if self.ap_progress == ApProgress::M1Seen {
                    self.complete(MessagePair::M12E2);
                }
                Ok(())
            }
            HandshakeMessage::M4 => match (self.sta_progress, self.eapol_source, self.ap_progress) {
                (StaProgress::M2Seen, source, _) if source != EapolSource::None => {
                    tracing::debug!(target: T_HANDSHAKE, "Already have M2, not worth");
                    Ok(())
                }
                (_, _, ApProgress::Unseen) => Err(CaptureReject::InsufficientProgress),
                (sta_progress, source, ap_progress) => {
                    if sta_progress == StaProgress::Unseen {
                        self.sta_progress = StaProgress::M4Seen;
                    }
                    if source == EapolSource::M3 {
                        self.complete(MessagePair::M34E3);
                        return Ok(());
                    }
                    self.buffer(packet, key, EapolSource::M4)?;
                    match ap_progress {
                        ApProgress::M1Seen => self.complete(MessagePair::M14E4),
                        ApProgress::M3Seen => self.complete(MessagePair::M34E4),
                        ApProgress::Unseen => {}
                    }
                    Ok(())
                }
            },
        }
    }

    /// Copy the packet into the record and move the source tag with it
    fn buffer(
        &mut self,
        packet: &EapolPacket<'_>,
        key: &EapolKeyPacket,
        source: EapolSource,
    ) -> std::result::Result<(), CaptureReject> {
        self.record.capture_eapol(packet, key)?;
        self.eapol_source = source;
        Ok(())
    }

    fn complete(&mut self, pair: MessagePair) {
        if self.record.message_pair.is_some() {
            return;
        }
        self.record.message_pair = Some(pair);
        tracing::info!(
            target: T_HANDSHAKE,
            ap = %self.record.mac_ap,
            sta = %self.record.mac_sta,
            eapol_len = self.record.eapol_len,
            "Handshake captured, message pair {}",
            pair
        );
    }
}

/// AP-origin if the source is the BSSID, STA-origin if the destination is
pub fn classify(frame: &DataFrame<'_>) -> std::result::Result<FrameRole, CaptureReject> {
    if frame.source == frame.bssid {
        Ok(FrameRole::Ap)
    } else if frame.destination == frame.bssid {
        Ok(FrameRole::Sta)
    } else {
        Err(CaptureReject::UnknownRole)
    }
}

/// M1 vs M3 by MIC presence, M2 vs M4 by nonce presence
pub fn identify(role: FrameRole, key: &EapolKeyPacket) -> HandshakeMessage {
    match (role, key.mic_is_empty(), key.nonce_is_empty()) {
        (FrameRole::Ap, true, _) => HandshakeMessage::M1,
        (FrameRole::Ap, false, _) => HandshakeMessage::M3,
        (FrameRole::Sta, _, false) => HandshakeMessage::M2,
        (FrameRole::Sta, _, true) => HandshakeMessage::M4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eapol::test_support::*;
    use crate::eapol::KEY_NONCE_OFFSET;
    use crate::record::HCCAPX_MAX_EAPOL_SIZE;

    const AP: MacAddress = MacAddress([0xAA, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const STA: MacAddress = MacAddress([0x5A, 0x00, 0x00, 0x00, 0x00, 0x02]);
    const OTHER: MacAddress = MacAddress([0x0E, 0x00, 0x00, 0x00, 0x00, 0x03]);

    const ANONCE: [u8; 32] = [0xA1; 32];
    const SNONCE: [u8; 32] = [0x5B; 32];

    struct Msg {
        role: FrameRole,
        payload: Vec<u8>,
        eapol: Vec<u8>,
    }

    impl Msg {
        fn new(role: FrameRole, eapol: Vec<u8>) -> Self {
            Self {
                role,
                payload: llc(&eapol),
                eapol,
            }
        }

        fn frame(&self) -> DataFrame<'_> {
            self.frame_between(AP, STA)
        }

        fn frame_between(&self, ap: MacAddress, sta: MacAddress) -> DataFrame<'_> {
            match self.role {
                FrameRole::Ap => DataFrame::new(sta, ap, ap, &self.payload),
                FrameRole::Sta => DataFrame::new(ap, sta, ap, &self.payload),
            }
        }

        /// What the record buffer should hold for this message
        fn zeroed(&self) -> Vec<u8> {
            let mut v = self.eapol.clone();
            v[81..97].fill(0);
            v
        }
    }

    fn m1() -> Msg {
        Msg::new(FrameRole::Ap, eapol_key(M1_INFO, ANONCE, [0; 16], &[]))
    }

    fn m2() -> Msg {
        Msg::new(FrameRole::Sta, eapol_key(M2_INFO, SNONCE, [0x22; 16], &[0x30; 22]))
    }

    fn m3() -> Msg {
        Msg::new(FrameRole::Ap, eapol_key(M3_INFO, ANONCE, [0x33; 16], &[0x44; 56]))
    }

    fn m4() -> Msg {
        Msg::new(FrameRole::Sta, eapol_key(M4_INFO, [0; 32], [0x44; 16], &[]))
    }

    fn engine() -> HandshakeCapture {
        HandshakeCapture::new(b"TestNet").unwrap()
    }

    fn feed(engine: &mut HandshakeCapture, msgs: &[&Msg]) {
        for msg in msgs {
            let _ = engine.process_frame(&msg.frame());
        }
    }

    #[test]
    fn test_classify_roles() {
        let payload = [];
        assert_eq!(classify(&DataFrame::new(STA, AP, AP, &payload)), Ok(FrameRole::Ap));
        assert_eq!(classify(&DataFrame::new(AP, STA, AP, &payload)), Ok(FrameRole::Sta));
        assert_eq!(
            classify(&DataFrame::new(STA, OTHER, AP, &payload)),
            Err(CaptureReject::UnknownRole)
        );
    }

    #[test]
    fn test_identify_messages() {
        for (msg, expected) in [
            (m1(), HandshakeMessage::M1),
            (m2(), HandshakeMessage::M2),
            (m3(), HandshakeMessage::M3),
            (m4(), HandshakeMessage::M4),
        ] {
            let (_, key) = eapol::decode(&msg.frame()).unwrap();
            assert_eq!(identify(msg.role, &key), expected);
        }
    }

    #[test]
    fn test_m1_m2_pair() {
        let mut e = engine();
        let (m1, m2) = (m1(), m2());
        assert_eq!(e.process_frame(&m1.frame()), Ok(HandshakeMessage::M1));
        assert!(e.record().is_none());
        assert_eq!(e.process_frame(&m2.frame()), Ok(HandshakeMessage::M2));

        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M12E2));
        assert_eq!(record.eapol(), m2.zeroed().as_slice());
        assert_eq!(record.keymic, [0x22; 16]);
        assert_eq!(record.nonce_ap, ANONCE);
        assert_eq!(record.nonce_sta, SNONCE);
        assert_eq!(record.mac_ap, AP);
        assert_eq!(record.mac_sta, STA);
        assert_eq!(record.essid(), b"TestNet");
        assert_eq!(e.eapol_source(), EapolSource::M2);
    }

    #[test]
    fn test_m1_m4_pair() {
        let mut e = engine();
        let m4 = m4();
        feed(&mut e, &[&m1(), &m4]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M14E4));
        assert_eq!(record.eapol(), m4.zeroed().as_slice());
        assert_eq!(e.sta_progress(), StaProgress::M4Seen);
    }

    #[test]
    fn test_m2_m3_pair_keeps_m2_buffer() {
        let mut e = engine();
        let m2 = m2();
        feed(&mut e, &[&m2, &m3()]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M32E2));
        assert_eq!(record.eapol(), m2.zeroed().as_slice());
        assert_eq!(e.eapol_source(), EapolSource::M2);
        assert_eq!(e.ap_progress(), ApProgress::M3Seen);
        // No M1, so no ANonce unless asked for
        assert_eq!(record.nonce_ap, [0u8; 32]);
    }

    #[test]
    fn test_m2_overflow_then_m3_pairs_on_m3_buffer() {
        let mut e = engine();
        let big_m2 = Msg::new(
            FrameRole::Sta,
            eapol_key(M2_INFO, SNONCE, [0x22; 16], &[0x30; 200]),
        );
        let m3 = m3();
        assert!(matches!(
            e.process_frame(&big_m2.frame()),
            Err(CaptureReject::Overflow { .. })
        ));
        assert_eq!(e.sta_progress(), StaProgress::M2Seen);
        assert_eq!(e.eapol_source(), EapolSource::None);

        feed(&mut e, &[&m3]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M32E3));
        assert_eq!(record.eapol(), m3.zeroed().as_slice());
        assert_eq!(record.keymic, [0x33; 16]);
    }

    #[test]
    fn test_m3_m4_pair() {
        let mut e = engine();
        let m4 = m4();
        feed(&mut e, &[&m3(), &m4]);
        // M3 alone buffers M3, M4 then pairs against it
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M34E3));
        assert_eq!(e.eapol_source(), EapolSource::M3);
    }

    #[test]
    fn test_m3_overflow_then_m4_pair_on_m4_buffer() {
        let mut e = engine();
        let big_m3 = Msg::new(
            FrameRole::Ap,
            eapol_key(M3_INFO, ANONCE, [0x33; 16], &[0x44; 180]),
        );
        let m4 = m4();
        feed(&mut e, &[&big_m3, &m4]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M34E4));
        assert_eq!(record.eapol(), m4.zeroed().as_slice());
        assert_eq!(e.stats().overflows, 1);
    }

    #[test]
    fn test_m4_before_ap_is_insufficient() {
        let mut e = engine();
        assert_eq!(
            e.process_frame(&m4().frame()),
            Err(CaptureReject::InsufficientProgress)
        );
        assert_eq!(e.eapol_source(), EapolSource::None);
        assert_eq!(e.sta_progress(), StaProgress::Unseen);
        assert!(e.record().is_none());
        assert_eq!(e.stats().insufficient_progress, 1);

        // Dropped M4 does not count as station progress later on
        feed(&mut e, &[&m1(), &m4()]);
        assert_eq!(e.sta_progress(), StaProgress::M4Seen);
        assert_eq!(e.message_pair(), Some(MessagePair::M14E4));
    }

    #[test]
    fn test_m4_after_m2_not_worth_it() {
        let mut e = engine();
        let m2 = m2();
        feed(&mut e, &[&m2, &m4()]);
        assert_eq!(e.eapol_source(), EapolSource::M2);
        assert!(e.record().is_none());
        assert_eq!(e.partial_record().eapol(), m2.zeroed().as_slice());
    }

    #[test]
    fn test_pair_never_rewritten() {
        let mut e = engine();
        let m2 = m2();
        feed(&mut e, &[&m1(), &m2]);
        assert_eq!(e.message_pair(), Some(MessagePair::M12E2));
        let before = e.partial_record().clone();

        let late_m2 = Msg::new(FrameRole::Sta, eapol_key(M2_INFO, [0x77; 32], [0x99; 16], &[]));
        feed(&mut e, &[&m3(), &m4(), &late_m2, &m1()]);
        assert_eq!(e.message_pair(), Some(MessagePair::M12E2));
        assert_eq!(e.partial_record(), &before);
        assert_eq!(e.stats().after_complete, 4);
    }

    #[test]
    fn test_station_conflict_leaves_state() {
        let mut fresh = engine();
        feed(&mut fresh, &[&m2()]);
        assert_eq!(fresh.partial_record().mac_sta, STA);

        let m3 = m3();
        let err = fresh.process_frame(&m3.frame_between(AP, OTHER)).unwrap_err();
        assert_eq!(
            err,
            CaptureReject::AddressConflict {
                role: FrameRole::Sta,
                expected: STA,
                actual: OTHER
            }
        );
        assert_eq!(fresh.ap_progress(), ApProgress::Unseen);
        assert_eq!(fresh.eapol_source(), EapolSource::M2);
        assert!(fresh.partial_record().mac_ap.is_zero());
        assert!(fresh.record().is_none());
        assert_eq!(fresh.stats().address_conflicts, 1);

        // Same check once complete
        let mut e = engine();
        feed(&mut e, &[&m1(), &m2()]);
        let before = e.partial_record().clone();
        let m2 = m2();
        assert!(e.process_frame(&m2.frame_between(AP, OTHER)).is_err());
        assert_eq!(e.partial_record(), &before);
    }

    #[test]
    fn test_ap_conflict_rejected() {
        let mut e = engine();
        feed(&mut e, &[&m1()]);
        let m3 = m3();
        let err = e.process_frame(&m3.frame_between(OTHER, STA)).unwrap_err();
        assert!(matches!(
            err,
            CaptureReject::AddressConflict {
                role: FrameRole::Ap,
                ..
            }
        ));
        assert_eq!(e.ap_progress(), ApProgress::M1Seen);
        assert_eq!(e.partial_record().mac_ap, AP);
    }

    #[test]
    fn test_unknown_role_counted() {
        let mut e = engine();
        let m1 = m1();
        let frame = DataFrame::new(STA, OTHER, AP, &m1.payload);
        assert_eq!(e.process_frame(&frame), Err(CaptureReject::UnknownRole));
        assert_eq!(e.stats().unknown_role, 1);
        assert_eq!(e.ap_progress(), ApProgress::Unseen);
    }

    #[test]
    fn test_non_eapol_payload_is_decode_reject() {
        let mut e = engine();
        let frame = DataFrame::new(STA, AP, AP, &[0x01, 0x02, 0x03]);
        assert!(matches!(e.process_frame(&frame), Err(CaptureReject::Decode(_))));
        assert_eq!(e.stats().decode_errors, 1);
        assert!(e.partial_record().mac_ap.is_zero());
    }

    #[test]
    fn test_latest_anonce_pairs_with_m2() {
        let mut e = engine();
        let first_m1 = Msg::new(FrameRole::Ap, eapol_key(M1_INFO, [0x01; 32], [0; 16], &[]));
        let second_m1 = Msg::new(FrameRole::Ap, eapol_key(M1_INFO, [0x02; 32], [0; 16], &[]));
        feed(&mut e, &[&first_m1, &second_m1, &m2()]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M12E2));
        assert_eq!(record.nonce_ap, [0x02; 32]);
    }

    #[test]
    fn test_snonce_follows_buffered_m2() {
        let mut e = engine();
        let first_m2 = Msg::new(FrameRole::Sta, eapol_key(M2_INFO, [0x21; 32], [0x22; 16], &[]));
        let second_m2 = Msg::new(FrameRole::Sta, eapol_key(M2_INFO, [0x22; 32], [0x23; 16], &[]));
        feed(&mut e, &[&first_m2, &second_m2, &m3()]);

        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M32E2));
        assert_eq!(record.eapol(), second_m2.zeroed().as_slice());
        let buffered_snonce = &record.eapol()[4 + KEY_NONCE_OFFSET..4 + KEY_NONCE_OFFSET + 32];
        assert_eq!(record.nonce_sta.as_slice(), buffered_snonce);
        assert_eq!(record.nonce_sta, [0x22; 32]);
    }

    #[test]
    fn test_nonces_frozen_after_pairing() {
        let mut e = engine();
        feed(&mut e, &[&m1(), &m2()]);
        let late_m1 = Msg::new(FrameRole::Ap, eapol_key(M1_INFO, [0x0F; 32], [0; 16], &[]));
        feed(&mut e, &[&late_m1]);
        assert_eq!(e.record().unwrap().nonce_ap, ANONCE);
    }

    #[test]
    fn test_anonce_from_m3_option() {
        let mut e = HandshakeCapture::with_options(CaptureOptions {
            anonce_from_m3: true,
        });
        e.start_target(b"TestNet").unwrap();
        assert!(e.options().anonce_from_m3);
        feed(&mut e, &[&m2(), &m3()]);
        let record = e.record().unwrap();
        assert_eq!(record.message_pair, Some(MessagePair::M32E2));
        assert_eq!(record.nonce_ap, ANONCE);
    }

    #[test]
    fn test_start_target_resets_everything() {
        let mut e = engine();
        feed(&mut e, &[&m1(), &m2()]);
        assert!(e.record().is_some());

        e.start_target(b"Other").unwrap();
        assert!(e.record().is_none());
        assert_eq!(e.ap_progress(), ApProgress::Unseen);
        assert_eq!(e.sta_progress(), StaProgress::Unseen);
        assert_eq!(e.eapol_source(), EapolSource::None);
        assert!(e.partial_record().mac_ap.is_zero());
        assert_eq!(e.partial_record().essid(), b"Other");
        assert_eq!(e.stats(), &CaptureStats::default());

        // M2 alone no longer pairs with the old M1
        feed(&mut e, &[&m2()]);
        assert!(e.record().is_none());
        feed(&mut e, &[&m3()]);
        assert_eq!(e.message_pair(), Some(MessagePair::M32E2));
    }

    #[test]
    fn test_start_target_rejects_long_essid() {
        let mut e = engine();
        feed(&mut e, &[&m1()]);
        assert!(e.start_target(&[b'x'; 33]).is_err());
        assert_eq!(e.ap_progress(), ApProgress::M1Seen);
        assert_eq!(e.partial_record().essid(), b"TestNet");
    }

    #[test]
    fn test_overflow_never_buffered() {
        let mut e = engine();
        let huge = Msg::new(
            FrameRole::Sta,
            eapol_key(M2_INFO, SNONCE, [0x22; 16], &[0x30; HCCAPX_MAX_EAPOL_SIZE]),
        );
        feed(&mut e, &[&m1(), &huge]);
        assert!(e.record().is_none());
        assert_eq!(e.partial_record().eapol_len, 0);
    }
}
