use crate::checkpoint::log_path_for;
use crate::replay::status;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Show how far a previous replay of a dump got
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// SQL dump file
    #[arg(value_name = "DUMP")]
    pub dump: PathBuf,

    /// Checkpoint log (default: <DUMP>.log next to the dump)
    #[arg(short, long, value_name = "FILE")]
    pub checkpoint: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJsonOutput {
    dump: String,
    checkpoint: String,
    checkpoint_exists: bool,
    position: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_len: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    complete: Option<bool>,
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    if !args.dump.exists() {
        anyhow::bail!("dump file does not exist: {}", args.dump.display());
    }

    let checkpoint = args
        .checkpoint
        .unwrap_or_else(|| log_path_for(&args.dump));
    let report = status(&args.dump, &checkpoint)?;
    let percent = report.fraction().map(|f| f * 100.0);

    if args.json {
        let output = StatusJsonOutput {
            dump: args.dump.display().to_string(),
            checkpoint: checkpoint.display().to_string(),
            checkpoint_exists: checkpoint.exists(),
            position: report.position,
            stream_len: report.stream_len,
            percent,
            complete: report.is_complete(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Dump:       {}", args.dump.display());
    if checkpoint.exists() {
        println!("Checkpoint: {}", checkpoint.display());
    } else {
        println!("Checkpoint: {} (not started)", checkpoint.display());
    }
    match (report.stream_len, percent) {
        (Some(len), Some(pct)) => {
            println!("Position:   {} / {} bytes ({:.1}%)", report.position, len, pct)
        }
        _ => println!(
            "Position:   {} bytes of decompressed stream",
            report.position
        ),
    }
    if report.is_complete() == Some(true) {
        println!("Status:     complete");
    }

    Ok(())
}
