use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use error_stack::ResultExt;
use fts_rs::batch::{self, AverageMode};
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
    let mode = if clargs.interferograms {
        AverageMode::Interferograms
    } else {
        AverageMode::Spectra
    };

    let mean = batch::average(&clargs.files, mode).change_context(CliError::AverageFailed)?;
    log::info!("averaged {} files ({} points)", clargs.files.len(), mean.val.len());

    batch::save_spectrum(&mean, &clargs.output)
        .change_context_lazy(|| CliError::WriteFailed(clargs.output.clone()))?;
    Ok(())
}

/// Average the spectra (or interferograms) of several OPUS files.
///
/// All files must share an identical wavenumber grid; the mean is written
/// as two-column space-separated ASCII.
#[derive(Debug, Parser)]
struct Cli {
    /// Path the averaged spectrum is written to
    output: PathBuf,

    /// The OPUS files to average
    #[clap(required = true)]
    files: Vec<PathBuf>,

    /// Average the interferogram blocks instead of the spectra
    #[clap(short, long)]
    interferograms: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Could not average the input files")]
    AverageFailed,
    #[error("Error writing averaged spectrum to {}", .0.display())]
    WriteFailed(PathBuf),
}
