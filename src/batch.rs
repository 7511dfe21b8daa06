//! Per-file batch operations: averaging, ratioing, and ASCII export of
//! spectra and interferograms.
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use rayon::prelude::*;

use crate::fts::{FtsError, FtsFile, FtsOptions};
use crate::interpolation::{InterpolationError, InterpolationMethod, LinearInterp};

pub type BatchResult<T> = Result<T, BatchError>;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("No input files given")]
    NoInputs,
    #[error("Wavenumber axes differ: {0}")]
    AxisMismatch(String),
    #[error("{} does not contain the requested {what} data", .path.display())]
    MissingData { path: PathBuf, what: &'static str },
    #[error(transparent)]
    Fts(#[from] FtsError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("I/O error writing spectrum: {0}")]
    Io(#[from] std::io::Error),
}

/// Which data block the batch operations work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum AverageMode {
    #[strum(serialize = "spectrum")]
    Spectra,
    #[strum(serialize = "interferogram")]
    Interferograms,
}

/// A spectrum (or interferogram) with its x axis, as handed between the
/// batch tools.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub wvn: Array1<f64>,
    pub val: Array1<f64>,
}

/// Average the selected data block over all `paths`.
///
/// Files are parsed in parallel; every file must carry the requested block
/// on an identical (pointwise equal) wavenumber grid. Interferograms have
/// no stored x axis, so they average over a sample-index axis instead.
pub fn average(paths: &[PathBuf], mode: AverageMode) -> BatchResult<Spectrum> {
    if paths.is_empty() {
        return Err(BatchError::NoInputs);
    }

    let opts = match mode {
        AverageMode::Spectra => FtsOptions {
            spectrum: true,
            ..Default::default()
        },
        AverageMode::Interferograms => FtsOptions {
            interferogram: true,
            ..Default::default()
        },
    };

    let loaded: Vec<(&PathBuf, Spectrum)> = paths
        .par_iter()
        .map(|path| {
            let fts = FtsFile::open(path, opts)?;
            let spec = extract(&fts, mode).ok_or_else(|| BatchError::MissingData {
                path: path.clone(),
                what: match mode {
                    AverageMode::Spectra => "spectrum",
                    AverageMode::Interferograms => "interferogram",
                },
            })?;
            Ok((path, spec))
        })
        .collect::<BatchResult<Vec<_>>>()?;

    let mut iter = loaded.into_iter();
    let (first_path, first) = iter.next().expect("paths checked non-empty above");
    let wvn = first.wvn;
    let mut acc = first.val;
    let mut count = 1usize;
    for (path, spec) in iter {
        if spec.wvn != wvn {
            return Err(BatchError::AxisMismatch(format!(
                "{} and {}",
                first_path.display(),
                path.display()
            )));
        }
        acc += &spec.val;
        count += 1;
    }
    acc /= count as f64;

    Ok(Spectrum { wvn, val: acc })
}

fn extract(fts: &FtsFile, mode: AverageMode) -> Option<Spectrum> {
    match mode {
        AverageMode::Spectra => Some(Spectrum {
            wvn: fts.spcwvn.clone()?,
            val: fts.spc.clone()?,
        }),
        AverageMode::Interferograms => {
            let val = fts.ifg.clone()?;
            let wvn = Array1::from_iter((0..val.len()).map(|i| i as f64));
            Some(Spectrum { wvn, val })
        }
    }
}

/// The ratio `spec1 / spec2`.
///
/// With `interpolate`, `spec2` is linearly resampled onto `spec1`'s grid
/// (clamped at the ends); otherwise the grids must match pointwise. With
/// `normalise`, the ratio is divided by its own mean.
pub fn divide_spectra(
    spec1: &Spectrum,
    spec2: &Spectrum,
    interpolate: bool,
    normalise: bool,
) -> BatchResult<Spectrum> {
    let denominator = if interpolate {
        let xs: Vec<f64> = spec2.wvn.to_vec();
        let ys: Vec<f64> = spec2.val.to_vec();
        let targets: Vec<f64> = spec1.wvn.to_vec();
        let resampled = LinearInterp::new(true).interp1d_many(&xs, &ys, &targets)?;
        Array1::from_vec(resampled)
    } else {
        if spec1.wvn != spec2.wvn {
            return Err(BatchError::AxisMismatch(
                "numerator and denominator".to_string(),
            ));
        }
        spec2.val.clone()
    };

    let mut val = &spec1.val / &denominator;
    if normalise {
        if let Some(mean) = val.mean() {
            if mean != 0.0 {
                val /= mean;
            } else {
                log::warn!("ratio has zero mean, skipping normalization");
            }
        }
    }

    Ok(Spectrum {
        wvn: spec1.wvn.clone(),
        val,
    })
}

/// Write a spectrum as two-column space-separated ASCII.
pub fn save_spectrum(spec: &Spectrum, path: &Path) -> BatchResult<()> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    for (w, v) in spec.wvn.iter().zip(spec.val.iter()) {
        writeln!(out, "{w:.18e} {v:.18e}")?;
    }
    out.flush()?;
    Ok(())
}
