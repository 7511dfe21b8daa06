use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use error_stack::{Report, ResultExt};
use fts_rs::batch::{self, Spectrum};
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
    let numerator = load_spectrum(&clargs.numerator)?;
    let denominator = load_spectrum(&clargs.denominator)?;

    let ratio = batch::divide_spectra(
        &numerator,
        &denominator,
        clargs.interpolate,
        !clargs.no_normalise,
    )
    .change_context(CliError::RatioFailed)?;

    batch::save_spectrum(&ratio, &clargs.output)
        .change_context_lazy(|| CliError::WriteFailed(clargs.output.clone()))?;
    Ok(())
}

fn load_spectrum(path: &PathBuf) -> error_stack::Result<Spectrum, CliError> {
    let fts = FtsFile::open(
        path,
        FtsOptions {
            spectrum: true,
            ..Default::default()
        },
    )
    .change_context_lazy(|| CliError::ReadError(path.clone()))?;

    match (fts.spcwvn, fts.spc) {
        (Some(wvn), Some(val)) => Ok(Spectrum { wvn, val }),
        _ => Err(Report::new(CliError::NoSpectrum(path.clone()))),
    }
}

/// Divide one OPUS spectrum by another.
///
/// The ratio is normalized by its own mean unless `--no-normalise` is
/// given, and written as two-column space-separated ASCII.
#[derive(Debug, Parser)]
struct Cli {
    /// The spectrum file forming the numerator
    numerator: PathBuf,

    /// The spectrum file forming the denominator
    denominator: PathBuf,

    /// Path the ratio spectrum is written to
    output: PathBuf,

    /// Resample the denominator onto the numerator's wavenumber grid
    /// instead of requiring identical grids
    #[clap(short, long)]
    interpolate: bool,

    /// Keep the raw ratio instead of dividing it by its mean
    #[clap(long)]
    no_normalise: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Error opening/reading OPUS file: {}", .0.display())]
    ReadError(PathBuf),
    #[error("{} does not contain a spectrum data block", .0.display())]
    NoSpectrum(PathBuf),
    #[error("Could not compute the spectrum ratio")]
    RatioFailed,
    #[error("Error writing ratio spectrum to {}", .0.display())]
    WriteFailed(PathBuf),
}
