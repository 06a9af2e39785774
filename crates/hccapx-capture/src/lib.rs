#![deny(unsafe_op_in_unsafe_fn)]
//! WPA/WPA2 4-way handshake capture into hashcat HCCAPX records.
//!
//! Feed EAPOL-Key data frames for one network to a [`HandshakeCapture`]; once it
//! has paired a nonce-carrying message with a MIC-carrying one, [`HandshakeCapture::record`]
//! yields an [`HccapxRecord`] ready for [`save_record`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod eapol;
pub mod engine;
pub mod error;
pub mod frames;
pub mod pcap;
pub mod radiotap;
pub mod record;
pub mod writer;

pub use cli::{Cli, Commands, OutputFormat};
pub use commands::{dispatch_command, CommandOutput};
pub use config::CaptureConfig;
pub use convert::{convert_file, convert_frames, ConvertReport, ConvertRequest};
pub use engine::{
    ApProgress, CaptureOptions, CaptureStats, EapolSource, FrameRole, HandshakeCapture,
    HandshakeMessage, StaProgress,
};
pub use error::{CaptureReject, HccapxError, Result};
pub use frames::{DataFrame, MacAddress};
pub use record::{HccapxRecord, MessagePair};
pub use writer::{read_records, save_record, HccapxWriter};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
