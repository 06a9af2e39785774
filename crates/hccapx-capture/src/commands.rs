//! Subcommand handlers behind the `hccapx` binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::cli::{Commands, ConvertArgs, InspectArgs};
use crate::config::CaptureConfig;
use crate::convert::{self, ConvertRequest};
use crate::engine::CaptureOptions;
use crate::record::HccapxRecord;
use crate::writer;

/// Result of a command that ran to the end
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// False when the command worked but found nothing usable
    pub success: bool,
    pub message: String,
    pub data: Value,
}

pub fn dispatch_command(config: &CaptureConfig, command: Commands) -> Result<CommandOutput> {
    match command {
        Commands::Convert(args) => handle_convert(config, args),
        Commands::Inspect(args) => handle_inspect(args),
    }
}

fn handle_convert(config: &CaptureConfig, args: ConvertArgs) -> Result<CommandOutput> {
    let request = ConvertRequest {
        essid: args.essid.into_bytes(),
        bssid: args.bssid.or(config.bssid),
        options: CaptureOptions {
            anonce_from_m3: args.anonce_from_m3 || config.anonce_from_m3,
        },
    };

    let conversion = convert::convert_file(&args.input, &request)
        .with_context(|| format!("converting {}", args.input.display()))?;
    let mut data = serde_json::to_value(&conversion.report)?;

    let record = match conversion.record {
        Some(record) => record,
        None => {
            return Ok(CommandOutput {
                success: false,
                message: format!("No usable handshake in {}", args.input.display()),
                data,
            })
        }
    };

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));
    writer::save_record(&output, &record)
        .with_context(|| format!("writing {}", output.display()))?;
    data["output"] = json!(output.display().to_string());

    Ok(CommandOutput {
        success: true,
        message: format!(
            "Handshake saved to {} (message pair {})",
            output.display(),
            record
                .message_pair
                .map(|pair| pair.to_string())
                .unwrap_or_default()
        ),
        data,
    })
}

fn handle_inspect(args: InspectArgs) -> Result<CommandOutput> {
    let bytes = fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let records = writer::read_records(&bytes)
        .with_context(|| format!("decoding {}", args.file.display()))?;
    let summaries: Vec<_> = records.iter().map(HccapxRecord::summary).collect();

    Ok(CommandOutput {
        success: true,
        message: format!("{} record(s) in {}", records.len(), args.file.display()),
        data: json!({ "records": summaries }),
    })
}

/// `capture.pcap` -> `capture.hccapx`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("hccapx")
}
