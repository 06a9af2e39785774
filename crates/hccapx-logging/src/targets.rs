/// Handshake state machine diagnostics (role, message, pairing, rejects).
pub const T_HANDSHAKE: &str = "hccapx::handshake";
/// Offline frame sources (pcap reading, radiotap stripping).
pub const T_CAPTURE: &str = "hccapx::capture";
