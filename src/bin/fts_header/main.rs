use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use error_stack::ResultExt;
use fts_rs::fts::{FtsFile, FtsOptions};
use fts_rs::logging::init_logging;

fn main() -> ExitCode {
    let clargs = Cli::parse();
    init_logging(clargs.verbosity.log_level_filter());
    if let Err(e) = driver(clargs) {
        eprintln!("{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let fts = FtsFile::open(&clargs.file, FtsOptions::default())
        .change_context_lazy(|| CliError::ReadError(clargs.file.clone()))?;

    if clargs.structure {
        for (name, desc) in fts.structure.iter() {
            println!("{name}");
            println!("\toffset = {}", desc.offset);
            println!("\tlength = {}", desc.length);
        }
        return Ok(());
    }

    for (block, params) in fts.header.iter() {
        println!("{block}");
        for (key, value) in params.iter() {
            let name = long_name(block, key).unwrap_or("");
            println!("  {key:>3} {name:>30} {:>30}", value.to_string());
        }
    }

    if clargs.events {
        println!();
        for event in fts.events() {
            println!("{event}");
        }
    }

    Ok(())
}

/// The human-readable names of the commonly used header parameters
/// (not complete).
fn long_name(block: &str, key: &str) -> Option<&'static str> {
    let named = match (block, key) {
        ("Acquisition Parameters", "AQM") => "Acquisition Mode",
        ("Acquisition Parameters", "HFW") => "Wanted High Frequency Limit",
        ("Acquisition Parameters", "LFW") => "Wanted Low Frequency Limit",
        ("Acquisition Parameters", "NSS") => "Sample Scans",
        ("Acquisition Parameters", "RES") => "Resolution",
        ("FT Parameters", "APF") => "Apodization Function",
        ("FT Parameters", "PHR") => "Phase Resolution",
        ("FT Parameters", "ZFF") => "Zero Filling Factor",
        ("Optic Parameters", "APT") => "Aperture Setting",
        ("Optic Parameters", "BMS") => "Beamsplitter Setting",
        ("Optic Parameters", "CHN") => "Measurement Channel",
        ("Optic Parameters", "DTC") => "Detector Setting",
        ("Optic Parameters", "HPF") => "High Pass Filter",
        ("Optic Parameters", "LPF") => "Low Pass Filter",
        ("Optic Parameters", "OPF") => "Optical Filter Setting",
        ("Optic Parameters", "PGN") => "Preamplifier Gain",
        ("Optic Parameters", "SRC") => "Source Setting",
        ("Optic Parameters", "VEL") => "Scanner Velocity",
        ("Instrument Parameters", "HFL") => "High Folding Limit",
        ("Instrument Parameters", "LFL") => "Low Folding Limit",
        ("Instrument Parameters", "LWN") => "Laser Wavenumber",
        ("Instrument Parameters", "GFW") => "Number of Good FW Scans",
        ("Instrument Parameters", "GBW") => "Number of Good BW Scans",
        ("Instrument Parameters", "BFW") => "Number of Bad FW Scans",
        ("Instrument Parameters", "BBW") => "Number of Bad BW Scans",
        ("Instrument Parameters", "PKA") => "Peak Amplitude",
        ("Instrument Parameters", "PKL") => "Peak Location",
        _ if block.starts_with("Data Parameters") => match key {
            "DPF" => "Data Point Format",
            "FXV" => "Frequency of First Point",
            "LXV" => "Frequency of Last Point",
            "NPT" => "Number of Points",
            "DAT" => "Date of Measurement",
            "TIM" => "Time of Measurement",
            _ => return None,
        },
        _ => return None,
    };
    Some(named)
}

/// Print the decoded header of an OPUS FTS file.
///
/// Each header block is printed with its parameters in file order;
/// recognized parameter keys are annotated with their long names. With
/// `--structure`, the block directory (offsets and lengths) is printed
/// instead.
///
/// Exits 0 on success and non-zero when the file cannot be read or is not
/// an OPUS file.
#[derive(Debug, Parser)]
struct Cli {
    /// The OPUS file to inspect
    file: PathBuf,

    /// Print the block structure instead of the decoded header
    #[clap(short, long)]
    structure: bool,

    /// Also print the model's event log after the header
    #[clap(short, long)]
    events: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Error opening/reading OPUS file: {}", .0.display())]
    ReadError(PathBuf),
}
