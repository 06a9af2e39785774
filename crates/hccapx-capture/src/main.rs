#![deny(unsafe_op_in_unsafe_fn)]
use anyhow::Result;
use clap::Parser;
use hccapx_capture::{dispatch_command, CaptureConfig, Cli, OutputFormat};
use serde_json::{json, Value};

fn main() {
    let cli = Cli::parse();
    let format = cli.output_format;

    let mut config = match cli.root.clone() {
        Some(root) => CaptureConfig::load(root),
        None => CaptureConfig::from_env(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    let log_dir = config.log_dir();
    let guards = match hccapx_logging::init("hccapx", Some(log_dir.as_path()), &config.logging) {
        Ok(guards) => Some(guards),
        Err(err) => {
            eprintln!("Logging unavailable: {err}");
            None
        }
    };
    config.log_warnings();
    tracing::debug!(version = hccapx_capture::VERSION, root = %config.root_path.display(), "Starting");

    let code = match run(&config, cli, format) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            emit_error(format, &err);
            1
        }
    };
    // flush file writers before exiting
    drop(guards);
    std::process::exit(code);
}

fn run(config: &CaptureConfig, cli: Cli, output_format: OutputFormat) -> Result<bool> {
    let output = dispatch_command(config, cli.command)?;
    let status = if output.success { "ok" } else { "error" };
    emit_payload(output_format, status, output.message, output.data)?;
    Ok(output.success)
}

fn emit_error(format: OutputFormat, err: &anyhow::Error) {
    let details: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
    let payload = json!({
        "status": "error",
        "message": err.to_string(),
        "details": details,
        "data": Value::Null,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            eprintln!("Error: {}", err);
            for detail in details.iter().skip(1) {
                eprintln!("  -> {}", detail);
            }
        }
    }
}

fn emit_payload(format: OutputFormat, status: &str, message: String, data: Value) -> Result<()> {
    let payload = json!({
        "status": status,
        "message": message,
        "data": data,
    });

    match format {
        OutputFormat::Json => println!("{}", payload),
        OutputFormat::Text => {
            println!("{}", payload["message"].as_str().unwrap_or_default());
            if !payload["data"].is_null() {
                let pretty = serde_json::to_string_pretty(&payload["data"])?;
                println!("{pretty}");
            }
        }
    }
    Ok(())
}
