use std::fs;

use hccapx_capture::eapol::{EAPOL_MIC_OFFSET, LLC_SNAP_EAPOL};
use hccapx_capture::radiotap::MINIMAL_HEADER;
use hccapx_capture::{
    convert_file, read_records, save_record, CaptureOptions, CaptureReject, ConvertRequest,
    DataFrame, HandshakeCapture, HandshakeMessage, HccapxWriter, MacAddress, MessagePair,
};

const AP: MacAddress = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
const STA: MacAddress = MacAddress([0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);

const M1_INFO: u16 = 0x008A;
const M2_INFO: u16 = 0x010A;
const M3_INFO: u16 = 0x13CA;
const M4_INFO: u16 = 0x030A;

const ANONCE: [u8; 32] = [0xA1; 32];
const SNONCE: [u8; 32] = [0xB2; 32];
const MIC: [u8; 16] = [0x5A; 16];

fn eapol_key(key_info: u16, nonce: [u8; 32], mic: [u8; 16], key_data: &[u8]) -> Vec<u8> {
    let body_len = (95 + key_data.len()) as u16;
    let mut v = vec![0x02, 0x03];
    v.extend_from_slice(&body_len.to_be_bytes());
    v.push(0x02);
    v.extend_from_slice(&key_info.to_be_bytes());
    v.extend_from_slice(&16u16.to_be_bytes());
    v.extend_from_slice(&1u64.to_be_bytes());
    v.extend_from_slice(&nonce);
    v.extend_from_slice(&[0u8; 32]); // IV, RSC, ID
    v.extend_from_slice(&mic);
    v.extend_from_slice(&(key_data.len() as u16).to_be_bytes());
    v.extend_from_slice(key_data);
    v
}

fn payload(eapol: &[u8]) -> Vec<u8> {
    let mut v = LLC_SNAP_EAPOL.to_vec();
    v.extend_from_slice(eapol);
    v
}

fn m1() -> Vec<u8> {
    payload(&eapol_key(M1_INFO, ANONCE, [0; 16], &[]))
}

fn m2() -> Vec<u8> {
    payload(&eapol_key(M2_INFO, SNONCE, MIC, &[0xDD; 22]))
}

fn m3() -> Vec<u8> {
    payload(&eapol_key(M3_INFO, ANONCE, [0x3C; 16], &[0xEE; 56]))
}

fn m4() -> Vec<u8> {
    payload(&eapol_key(M4_INFO, [0; 32], [0x4D; 16], &[]))
}

fn ap_frame(payload: &[u8]) -> Vec<u8> {
    DataFrame::new(STA, AP, AP, payload).to_bytes()
}

fn sta_frame(payload: &[u8]) -> Vec<u8> {
    DataFrame::new(AP, STA, AP, payload).to_bytes()
}

fn radiotap_pcap(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0xa1b2c3d4u32.to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(&65535u32.to_le_bytes());
    buf.extend_from_slice(&127u32.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        let len = (MINIMAL_HEADER.len() + frame.len()) as u32;
        buf.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&MINIMAL_HEADER);
        buf.extend_from_slice(frame);
    }
    buf
}

fn feed(capture: &mut HandshakeCapture, frame: &[u8]) -> Result<HandshakeMessage, CaptureReject> {
    let parsed = DataFrame::parse(frame).expect("data frame");
    capture.process_frame(&parsed)
}

#[test]
fn full_handshake_pairs_m1_m2() {
    let mut capture = HandshakeCapture::new(b"HomeNet").unwrap();
    assert_eq!(feed(&mut capture, &ap_frame(&m1())), Ok(HandshakeMessage::M1));
    assert_eq!(feed(&mut capture, &sta_frame(&m2())), Ok(HandshakeMessage::M2));
    assert_eq!(feed(&mut capture, &ap_frame(&m3())), Ok(HandshakeMessage::M3));
    assert_eq!(feed(&mut capture, &sta_frame(&m4())), Ok(HandshakeMessage::M4));

    let record = capture.record().expect("complete record");
    assert_eq!(record.message_pair, Some(MessagePair::M12E2));
    assert_eq!(record.essid(), b"HomeNet");
    assert_eq!(record.mac_ap, AP);
    assert_eq!(record.mac_sta, STA);
    assert_eq!(record.nonce_ap, ANONCE);
    assert_eq!(record.nonce_sta, SNONCE);
    assert_eq!(record.keymic, MIC);
    assert_eq!(record.keyver, 2);
    assert_eq!(record.eapol_len as usize, 4 + 95 + 22);
    assert!(record.eapol()[EAPOL_MIC_OFFSET..EAPOL_MIC_OFFSET + 16]
        .iter()
        .all(|&b| b == 0));
    assert_eq!(capture.stats().after_complete, 2);
}

#[test]
fn late_join_pairs_m3_m4() {
    let mut capture = HandshakeCapture::new(b"HomeNet").unwrap();
    feed(&mut capture, &ap_frame(&m3())).unwrap();
    assert!(!capture.is_complete());
    feed(&mut capture, &sta_frame(&m4())).unwrap();

    let record = capture.record().expect("complete record");
    assert_eq!(record.message_pair, Some(MessagePair::M34E3));
    assert_eq!(record.keymic, [0x3C; 16]);
    // ANonce only comes from M1 unless asked otherwise
    assert_eq!(record.nonce_ap, [0; 32]);
}

#[test]
fn late_join_with_anonce_from_m3() {
    let mut capture = HandshakeCapture::with_options(CaptureOptions {
        anonce_from_m3: true,
    });
    capture.start_target(b"HomeNet").unwrap();
    feed(&mut capture, &ap_frame(&m3())).unwrap();
    feed(&mut capture, &sta_frame(&m4())).unwrap();
    assert_eq!(capture.record().unwrap().nonce_ap, ANONCE);
}

#[test]
fn pcap_to_hccapx_file() {
    let dir = tempfile::tempdir().unwrap();
    let pcap_path = dir.path().join("capture.pcap");
    let beacon = {
        let mut b = vec![0x80, 0x00, 0x00, 0x00];
        b.extend_from_slice(&[0xFF; 6]);
        b.extend_from_slice(&AP.0);
        b.extend_from_slice(&AP.0);
        b.extend_from_slice(&[0x00; 2]);
        b
    };
    fs::write(
        &pcap_path,
        radiotap_pcap(&[beacon, ap_frame(&m1()), sta_frame(&m2())]),
    )
    .unwrap();

    let request = ConvertRequest {
        essid: b"HomeNet".to_vec(),
        ..Default::default()
    };
    let conversion = convert_file(&pcap_path, &request).unwrap();
    assert_eq!(conversion.report.frames_read, 3);
    assert_eq!(conversion.report.eapol_frames, 2);
    let record = conversion.record.expect("record");

    let out = dir.path().join("out").join("capture.hccapx");
    save_record(&out, &record).unwrap();
    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len(), 393);
    assert_eq!(&bytes[0..4], b"HCPX");
    assert_eq!(bytes[8], MessagePair::M12E2.code());

    let decoded = read_records(&bytes).unwrap();
    assert_eq!(decoded, vec![record]);
}

#[test]
fn writer_concatenates_records() {
    let mut capture = HandshakeCapture::new(b"HomeNet").unwrap();
    feed(&mut capture, &ap_frame(&m1())).unwrap();
    feed(&mut capture, &sta_frame(&m2())).unwrap();
    let record = capture.record().unwrap().clone();

    let mut writer = HccapxWriter::new(Vec::new());
    writer.write_record(&record).unwrap();
    writer.write_record(&record).unwrap();
    assert!(writer.write_record(capture.partial_record()).is_ok());
    assert_eq!(writer.records(), 3);

    capture.start_target(b"Other").unwrap();
    assert!(writer.write_record(capture.partial_record()).is_err());
    assert_eq!(read_records(&writer.into_inner()).unwrap().len(), 3);
}

#[test]
fn hashcat_line_for_complete_record() {
    let mut capture = HandshakeCapture::new(b"HomeNet").unwrap();
    assert!(capture.partial_record().to_hashcat_22000().is_none());
    feed(&mut capture, &ap_frame(&m1())).unwrap();
    feed(&mut capture, &sta_frame(&m2())).unwrap();

    let line = capture.record().unwrap().to_hashcat_22000().unwrap();
    let fields: Vec<&str> = line.split('*').collect();
    assert_eq!(fields[0], "WPA");
    assert_eq!(fields[1], "02");
    assert_eq!(fields[2], "5a".repeat(16));
    assert_eq!(fields[3], "001122334455");
    assert_eq!(fields[4], "66778899aabb");
    assert_eq!(fields[5], "486f6d654e6574");
    assert_eq!(fields[8], "00");
}
