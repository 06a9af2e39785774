use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::frames::MacAddress;

#[derive(Parser, Debug)]
#[command(
    name = "hccapx",
    author,
    version,
    about = "Extract WPA/WPA2 handshakes into hashcat HCCAPX records"
)]
pub struct Cli {
    /// Override the working root (config/ and logs/ live here)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Output format for command responses
    #[arg(
        long = "output-format",
        value_enum,
        default_value_t = OutputFormat::Text,
        global = true
    )]
    pub output_format: OutputFormat,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull a handshake out of a pcap capture
    Convert(ConvertArgs),
    /// Decode an existing .hccapx file
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Legacy pcap file (radiotap or raw 802.11)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Network name stored in the record
    #[arg(short, long)]
    pub essid: String,

    /// Where to write the record; defaults to the input with a .hccapx extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only use frames from this access point
    #[arg(short, long)]
    pub bssid: Option<MacAddress>,

    /// Take the ANonce from M3 when M1 was missed
    #[arg(long)]
    pub anonce_from_m3: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
}
