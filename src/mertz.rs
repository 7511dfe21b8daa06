//! Transforming a double-sided interferogram into a calibrated wavenumber
//! spectrum with Mertz phase correction.
//!
//! The sequence follows the classic Mertz recipe: split the interferogram
//! into forward and backward branches, locate the ZPD of each, estimate a
//! low-resolution phase from a short symmetric window around ZPD, ramp-
//! apodize and transform the full branch, and rotate the complex spectrum
//! by the low-resolution phase so the signal lands in the real part.
use std::f64::consts::PI;

use ndarray::{s, Array1};
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::fts::FtsFile;
use crate::interpolation::{InterpolationMethod, LinearInterp};
use crate::utils::{argmax, argmax_abs, argmin, fftfreq_half, next_pow2};

pub type MertzResult<T> = Result<T, MertzError>;

#[derive(Debug, thiserror::Error)]
pub enum MertzError {
    #[error("File model has no interferogram loaded")]
    MissingInterferogram,
    #[error("Acquisition mode {0:?} is not supported; only double-sided (SD) interferograms can be transformed")]
    UnsupportedAcquisitionMode(String),
    #[error("Header parameter {0} is required and was not found")]
    MissingParameter(&'static str),
    #[error("ZPD search mode 'given' requires explicit ZPD positions for both branches")]
    MissingZpd,
    #[error("Interferogram branch is empty")]
    EmptyInterferogram,
    #[error("Burst at {pinl} is too close to the edge for a symmetry search needing {need} points either side (branch length {len})")]
    TooShortForSymmetry { need: usize, pinl: usize, len: usize },
    #[error("ZPDs at {zpd_fw} and {zpd_bw} leave no room for a phase interferogram")]
    InvalidPhaseWindow { zpd_fw: f64, zpd_bw: f64 },
    #[error("The low-resolution phase has not been determined or supplied yet")]
    PhaseNotDetermined,
    #[error("Stored phase has {actual} points, expected {expected}")]
    StoredPhaseLength { expected: usize, actual: usize },
}

/// How the zero-path-difference sample of each branch is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum ZpdSearchMode {
    /// Use the positions supplied in [`FtParams::zpd`].
    #[strum(serialize = "given")]
    Given,
    /// The sample with the largest absolute value.
    #[default]
    #[strum(serialize = "absolute-maximum")]
    AbsoluteMaximum,
    /// Sub-sample refinement of the absolute maximum by a parabola through
    /// it and its two neighbours.
    #[strum(serialize = "parabola")]
    Parabola,
    /// Sub-sample search for the shift that makes the burst most symmetric
    /// under a folded, cosine-weighted difference score.
    #[strum(serialize = "symmetry")]
    Symmetry,
}

/// Settings for one interferogram-to-spectrum transformation.
#[derive(Debug, Clone)]
pub struct FtParams {
    /// Sampling laser wavenumber; taken from the `LWN` header parameter
    /// when not given.
    pub laser_wvn: Option<f64>,
    /// Explicit (forward, backward) ZPD positions for [`ZpdSearchMode::Given`].
    pub zpd: (Option<f64>, Option<f64>),
    pub zpd_search_mode: ZpdSearchMode,
    /// Zero-filling factor applied on top of the next power of two, >= 1.
    pub zero_filling: usize,
    /// Half-width of the phase interferogram window in samples; defaults
    /// to `min(zpd_fw, zpd_bw) - 1`.
    pub phase_ifg_length: Option<usize>,
    /// Magnitude below which low-resolution phase points are replaced by
    /// interpolation, per branch.
    pub phase_threshold: (f64, f64),
    /// Truncate each branch to this optical path difference (cm).
    pub max_opd: Option<f64>,
    /// Lower frequency limit of the output spectrum.
    pub lfq: Option<f64>,
    /// Upper frequency limit of the output spectrum.
    pub hfq: Option<f64>,
}

impl Default for FtParams {
    fn default() -> Self {
        Self {
            laser_wvn: None,
            zpd: (None, None),
            zpd_search_mode: ZpdSearchMode::AbsoluteMaximum,
            zero_filling: 2,
            phase_ifg_length: None,
            phase_threshold: (0.0, 0.0),
            max_opd: None,
            lfq: None,
            hfq: None,
        }
    }
}

/// One transformation in progress: the prepared branches, their ZPDs, and
/// the intermediate and final spectra.
///
/// Create with [`FtSession::new`], then call [`determine_phase`]
/// (or [`set_stored_phase`]), [`ifg_to_spc`], and
/// [`apply_frequency_limits`] in that order.
///
/// [`determine_phase`]: FtSession::determine_phase
/// [`set_stored_phase`]: FtSession::set_stored_phase
/// [`ifg_to_spc`]: FtSession::ifg_to_spc
/// [`apply_frequency_limits`]: FtSession::apply_frequency_limits
pub struct FtSession {
    params: FtParams,
    laser_wvn: f64,
    ifg_fw: Array1<f64>,
    ifg_bw: Array1<f64>,
    zpd_fw: f64,
    zpd_bw: f64,
    phase_ifg_length: usize,
    /// Zero-filled FFT length.
    array_length: usize,
    spcwvn2: Array1<f64>,
    orig_spcwvn: Option<Array1<f64>>,
    phase_fw: Option<Array1<f64>>,
    phase_bw: Option<Array1<f64>>,
    phase: Option<Array1<f64>>,
    phase_spc: Option<Array1<Complex<f64>>>,
    spc2: Option<Array1<f64>>,
    spc2_complex: Option<Array1<Complex<f64>>>,
    planner: FftPlanner<f64>,
}

impl std::fmt::Debug for FtSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtSession")
            .field("params", &self.params)
            .field("laser_wvn", &self.laser_wvn)
            .field("ifg_fw", &self.ifg_fw)
            .field("ifg_bw", &self.ifg_bw)
            .field("zpd_fw", &self.zpd_fw)
            .field("zpd_bw", &self.zpd_bw)
            .field("phase_ifg_length", &self.phase_ifg_length)
            .field("array_length", &self.array_length)
            .field("spcwvn2", &self.spcwvn2)
            .field("orig_spcwvn", &self.orig_spcwvn)
            .field("phase_fw", &self.phase_fw)
            .field("phase_bw", &self.phase_bw)
            .field("phase", &self.phase)
            .field("phase_spc", &self.phase_spc)
            .field("spc2", &self.spc2)
            .field("spc2_complex", &self.spc2_complex)
            .finish()
    }
}

impl FtSession {
    /// Prepare a transformation of the interferogram held by `fts`.
    ///
    /// Splits the double-sided interferogram into its branches, removes
    /// the DC offset, locates the ZPDs, applies the OPD clip, and fixes
    /// the zero-filled array length and wavenumber axis.
    pub fn new(fts: &FtsFile, params: FtParams) -> MertzResult<Self> {
        let ifg = fts.ifg.as_ref().ok_or(MertzError::MissingInterferogram)?;
        if ifg.is_empty() {
            return Err(MertzError::EmptyInterferogram);
        }

        let aqm = fts
            .header_value("Acquisition Parameters", "AQM")
            .and_then(|v| v.as_str().ok())
            .ok_or(MertzError::MissingParameter("AQM"))?;
        if aqm != "SD" {
            return Err(MertzError::UnsupportedAcquisitionMode(aqm.to_string()));
        }

        let laser_wvn = match params.laser_wvn {
            Some(w) => w,
            None => fts
                .header_value("Instrument Parameters", "LWN")
                .and_then(|v| v.as_float().ok())
                .ok_or(MertzError::MissingParameter("LWN"))?,
        };

        let half = ifg.len() / 2;
        let mut ifg_fw = ifg.slice(s![..half]).to_owned();
        let mut ifg_bw = ifg.slice(s![half..;-1]).to_owned();
        remove_dc(&mut ifg_fw);
        remove_dc(&mut ifg_bw);

        let zpd_fw = find_zpd(&ifg_fw, params.zpd.0, params.zpd_search_mode)?;
        let zpd_bw = find_zpd(&ifg_bw, params.zpd.1, params.zpd_search_mode)?;

        if let Some(max_opd) = params.max_opd {
            let clip_fw = (zpd_fw.ceil() + 2.0 * laser_wvn * max_opd) as usize;
            let clip_bw = (zpd_bw.ceil() + 2.0 * laser_wvn * max_opd) as usize;
            ifg_fw = ifg_fw.slice(s![..clip_fw.min(ifg_fw.len())]).to_owned();
            ifg_bw = ifg_bw.slice(s![..clip_bw.min(ifg_bw.len())]).to_owned();
        }

        let phase_ifg_length = match params.phase_ifg_length {
            Some(n) => n,
            None => {
                let n = (zpd_fw.min(zpd_bw) - 1.0).floor();
                if n < 1.0 {
                    return Err(MertzError::InvalidPhaseWindow { zpd_fw, zpd_bw });
                }
                n as usize
            }
        };

        let array_length = next_pow2(ifg_fw.len()) * params.zero_filling.max(1);
        let spcwvn2 = fftfreq_half(array_length, 0.5 / laser_wvn);

        Ok(Self {
            params,
            laser_wvn,
            ifg_fw,
            ifg_bw,
            zpd_fw,
            zpd_bw,
            phase_ifg_length,
            array_length,
            spcwvn2,
            orig_spcwvn: fts.spcwvn.clone(),
            phase_fw: None,
            phase_bw: None,
            phase: None,
            phase_spc: None,
            spc2: None,
            spc2_complex: None,
            planner: FftPlanner::new(),
        })
    }

    /// Estimate the low-resolution phase of both branches from a
    /// cosine²-windowed interferogram around ZPD.
    pub fn determine_phase(&mut self) {
        // The forward threshold applies to both branches.
        let threshold = self.params.phase_threshold.0;

        let pif = phase_interferogram(&self.ifg_fw, self.phase_ifg_length, self.zpd_fw);
        let spc_fw = half_ifft(
            &mut self.planner,
            pack_ifg(&pif, self.zpd_fw, self.array_length),
        );
        let phase_fw = interpolate_phase(threshold, &spc_fw, phase_of_spc(&spc_fw));

        let pif = phase_interferogram(&self.ifg_bw, self.phase_ifg_length, self.zpd_bw);
        let spc_bw = half_ifft(
            &mut self.planner,
            pack_ifg(&pif, self.zpd_bw, self.array_length),
        );
        let phase_bw = interpolate_phase(threshold, &spc_bw, phase_of_spc(&spc_bw));

        self.phase = Some((&phase_fw + &phase_bw) / 2.0);
        self.phase_spc = Some((&spc_fw + &spc_bw).mapv(|c| c * 0.5));
        self.phase_fw = Some(phase_fw);
        self.phase_bw = Some(phase_bw);
    }

    /// Reuse a previously determined low-resolution phase instead of
    /// estimating one from this interferogram.
    pub fn set_stored_phase(
        &mut self,
        phase_fw: Array1<f64>,
        phase_bw: Array1<f64>,
    ) -> MertzResult<()> {
        let expected = self.array_length / 2;
        for phase in [&phase_fw, &phase_bw] {
            if phase.len() != expected {
                return Err(MertzError::StoredPhaseLength {
                    expected,
                    actual: phase.len(),
                });
            }
        }
        self.phase = Some((&phase_fw + &phase_bw) / 2.0);
        self.phase_fw = Some(phase_fw);
        self.phase_bw = Some(phase_bw);
        Ok(())
    }

    /// Transform both branches and combine them under Mertz correction
    /// into the final real spectrum.
    pub fn ifg_to_spc(&mut self) -> MertzResult<()> {
        let phase_fw = self.phase_fw.clone().ok_or(MertzError::PhaseNotDetermined)?;
        let phase_bw = self.phase_bw.clone().ok_or(MertzError::PhaseNotDetermined)?;

        let ramped = ramp_ifg(&self.ifg_fw, self.zpd_fw);
        let uncorr_fw = half_ifft(
            &mut self.planner,
            pack_ifg(&ramped, self.zpd_fw, self.array_length),
        );
        let ramped = ramp_ifg(&self.ifg_bw, self.zpd_bw);
        let uncorr_bw = half_ifft(
            &mut self.planner,
            pack_ifg(&ramped, self.zpd_bw, self.array_length),
        );

        let highres_fw = phase_of_spc(&uncorr_fw);
        let highres_bw = phase_of_spc(&uncorr_bw);

        let (spc_fw, cplx_fw) = mertz_correction(&uncorr_fw, &highres_fw, &phase_fw);
        let (spc_bw, cplx_bw) = mertz_correction(&uncorr_bw, &highres_bw, &phase_bw);

        self.spc2 = Some((&spc_fw + &spc_bw) / 2.0);
        self.spc2_complex = Some((&cplx_fw + &cplx_bw).mapv(|c| c * 0.5));
        Ok(())
    }

    /// Restrict the spectrum to the requested frequency window, or to the
    /// bounds of the file's original wavenumber axis (extended by half a
    /// bin) when no window was given. Without either, the spectrum is left
    /// at the full Nyquist range.
    pub fn apply_frequency_limits(&mut self) {
        let Some(spc2) = self.spc2.take() else {
            return;
        };

        let bounds = match (self.params.lfq, self.params.hfq) {
            (Some(lfq), Some(hfq)) => Some((lfq, hfq)),
            _ => match &self.orig_spcwvn {
                Some(orig) if orig.len() >= 2 => {
                    let half_bin = (orig[1] - orig[0]) / 2.0;
                    Some((orig[0] - half_bin, orig[orig.len() - 1] + half_bin))
                }
                _ => {
                    log::debug!(
                        "no frequency limits given and no original wavenumber axis present"
                    );
                    None
                }
            },
        };

        let Some((lo, hi)) = bounds else {
            self.spc2 = Some(spc2);
            return;
        };

        let keep: Vec<usize> = self
            .spcwvn2
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > lo && w < hi)
            .map(|(i, _)| i)
            .collect();
        let masked_wvn = Array1::from_iter(keep.iter().map(|&i| self.spcwvn2[i]));
        self.spc2 = Some(Array1::from_iter(keep.iter().map(|&i| spc2[i])));
        self.spcwvn2 = masked_wvn;
    }

    /// The corrected spectrum and its wavenumber axis, once
    /// [`FtSession::ifg_to_spc`] has run.
    pub fn spectrum(&self) -> Option<(&Array1<f64>, &Array1<f64>)> {
        self.spc2.as_ref().map(|s| (&self.spcwvn2, s))
    }

    pub fn complex_spectrum(&self) -> Option<&Array1<Complex<f64>>> {
        self.spc2_complex.as_ref()
    }

    /// The averaged low-resolution phase.
    pub fn phase(&self) -> Option<&Array1<f64>> {
        self.phase.as_ref()
    }

    /// The averaged low-resolution phase spectrum the phase was taken from.
    pub fn phase_spectrum(&self) -> Option<&Array1<Complex<f64>>> {
        self.phase_spc.as_ref()
    }

    pub fn branch_phases(&self) -> Option<(&Array1<f64>, &Array1<f64>)> {
        Some((self.phase_fw.as_ref()?, self.phase_bw.as_ref()?))
    }

    pub fn wavenumbers(&self) -> &Array1<f64> {
        &self.spcwvn2
    }

    pub fn zpd(&self) -> (f64, f64) {
        (self.zpd_fw, self.zpd_bw)
    }

    pub fn array_length(&self) -> usize {
        self.array_length
    }

    /// The laser wavenumber the session resolved (explicit or from `LWN`).
    pub fn laser_wvn(&self) -> f64 {
        self.laser_wvn
    }

    fn into_spectrum(self) -> MertzResult<(Array1<f64>, Array1<f64>)> {
        let spc = self.spc2.ok_or(MertzError::PhaseNotDetermined)?;
        Ok((self.spcwvn2, spc))
    }
}

impl FtsFile {
    /// Calculate a spectrum from this file's interferogram with Mertz
    /// phase correction, running the whole chain with the given settings.
    ///
    /// Returns the wavenumber axis and the corrected spectrum.
    pub fn calculate_spectrum(
        &self,
        params: FtParams,
    ) -> MertzResult<(Array1<f64>, Array1<f64>)> {
        let mut session = FtSession::new(self, params)?;
        session.determine_phase();
        session.ifg_to_spc()?;
        session.apply_frequency_limits();
        session.into_spectrum()
    }
}

/// Subtract the mean of the branch's second half, where the burst has
/// decayed and only the DC offset remains.
fn remove_dc(branch: &mut Array1<f64>) {
    let dc = branch
        .slice(s![branch.len() / 2..])
        .mean()
        .unwrap_or(0.0);
    *branch -= dc;
}

fn find_zpd(branch: &Array1<f64>, given: Option<f64>, mode: ZpdSearchMode) -> MertzResult<f64> {
    match mode {
        ZpdSearchMode::Given => given.ok_or(MertzError::MissingZpd),
        ZpdSearchMode::AbsoluteMaximum => {
            let k = argmax_abs(branch).ok_or(MertzError::EmptyInterferogram)?;
            Ok(k as f64)
        }
        ZpdSearchMode::Parabola => {
            let k = argmax_abs(branch).ok_or(MertzError::EmptyInterferogram)?;
            if k == 0 || k + 1 >= branch.len() {
                // No neighbours to fit through; the maximum itself is the
                // best available estimate
                return Ok(k as f64);
            }
            Ok(parabola_vertex(
                (k - 1) as f64,
                branch[k - 1],
                k as f64,
                branch[k],
                (k + 1) as f64,
                branch[k + 1],
            ))
        }
        ZpdSearchMode::Symmetry => symmetry_zpd(branch),
    }
}

/// Abscissa of the vertex of the parabola through three points.
fn parabola_vertex(x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> f64 {
    let denom = (x1 - x2) * (x1 - x3) * (x2 - x3);
    let a = (x3 * (y2 - y1) + x2 * (y1 - y3) + x1 * (y3 - y2)) / denom;
    let b = (x3 * x3 * (y1 - y2) + x2 * x2 * (y3 - y1) + x1 * x1 * (y2 - y3)) / denom;
    -b / (2.0 * a)
}

const SYMM_LPCO: usize = 1024;
const SYMM_NBURST: usize = 15;

/// Sub-sample ZPD from the shift that maximizes the symmetry of the burst.
///
/// An anchor is picked as the extremum deviating most from the branch mean;
/// a window of `2 * nburst + lpco` samples around it is scanned over
/// `2 * nburst` shifts, scoring each with a cosine-weighted folded
/// difference sum, and the best score is refined between samples.
fn symmetry_zpd(branch: &Array1<f64>) -> MertzResult<f64> {
    let ybar = branch.mean().unwrap_or(0.0);
    let kmax = argmax(branch).ok_or(MertzError::EmptyInterferogram)?;
    let kmin = argmin(branch).ok_or(MertzError::EmptyInterferogram)?;
    let pinl = if (branch[kmax] - ybar).abs() > (branch[kmin] - ybar).abs() {
        kmax
    } else {
        kmin
    };

    let margin = SYMM_NBURST + SYMM_LPCO / 2;
    if pinl < margin || pinl + margin > branch.len() {
        return Err(MertzError::TooShortForSymmetry {
            need: margin,
            pinl,
            len: branch.len(),
        });
    }
    let ac: Vec<f64> = branch.slice(s![pinl - margin..pinl + margin]).to_vec();
    Ok(pinl as f64 + best_shift(&ac, SYMM_NBURST, SYMM_LPCO))
}

/// The even and odd symmetry scores of one window, each in [-1, 1].
fn symmetry_scores(window: &[f64], lpco: usize) -> (f64, f64) {
    let n = window.len() as isize;
    let wrap = |i: isize| i.rem_euclid(n) as usize;
    let q = PI / lpco as f64;

    let mut sasumi = 0.0;
    let mut sadeli = 0.0;
    let mut sasump = 0.0;
    let mut sadelp = 0.0;
    for x in 0..lpco / 2 {
        let ww = (5.0 * (q * x as f64).cos() + (3.0 * q * x as f64).cos()) / 6.0;
        // The mirrored samples index from the end of the window for x > 0,
        // wrapping the way a negative index does
        let xm = window[wrap(-(x as isize))];
        let xp = window[wrap(1 - x as isize)];
        let xd = window[x];
        sasumi += ww * (xm + xd).abs();
        sadeli += ww * (xm - xd).abs();
        sasump += ww * (xp + xd).abs();
        sadelp += ww * (xp - xd).abs();
    }
    (
        (sasumi - sadeli) / (sasumi + sadeli),
        (sasump - sadelp) / (sasump + sadelp),
    )
}

/// Scan all shifts of the window, tracking the best running symmetry score
/// and interpolating the shift between samples.
fn best_shift(ac: &[f64], nburst: usize, lpco: usize) -> f64 {
    let eps = 1e-37;
    let mut smax = -999.0;
    let mut best = 0.0;
    let mut symiw = 0.0;
    let mut sympw = 0.0;
    for i in 0..2 * nburst {
        let window = &ac[i..ac.len() - 2 * nburst + i];
        let (symmi, symmp) = symmetry_scores(window, lpco);
        if sympw > smax {
            smax = sympw;
            let denom = eps + 4.0 * (2.0 * sympw - symiw - symmi).abs();
            best = i as f64 - 0.5 + (-symiw + symmi) / denom;
        }
        if symmi > smax {
            smax = symmi;
            let denom = eps + 4.0 * (2.0 * symmi - sympw - symmp).abs();
            best = i as f64 + (-sympw + symmp) / denom;
        }
        symiw = symmi;
        sympw = symmp;
    }
    best - nburst as f64
}

/// The branch windowed down to `phase_ifg_length` samples either side of
/// ZPD under a cosine² bell centered on the (fractional) ZPD.
fn phase_interferogram(ifg: &Array1<f64>, phase_ifg_length: usize, zpd: f64) -> Array1<f64> {
    let n = ifg.len();
    let izpd = (zpd.ceil() as usize).min(n);
    let lo = izpd.saturating_sub(phase_ifg_length);
    let hi = (izpd + phase_ifg_length).min(n);

    let mut out = Array1::zeros(n);
    for i in lo..hi {
        let distance = (i as f64 - zpd).abs();
        if distance <= phase_ifg_length as f64 {
            let c = (0.5 * PI * distance / phase_ifg_length as f64).cos();
            out[i] = ifg[i] * c * c;
        }
    }
    out
}

/// Rotate the branch into circular FFT order: the samples from ZPD onward
/// go to the start of the zero-filled array, the samples before ZPD wrap
/// to its tail, so the ZPD sample sits at index 0.
fn pack_ifg(ifg: &Array1<f64>, zpd: f64, array_length: usize) -> Vec<Complex<f64>> {
    let izpd = (zpd.ceil() as usize).min(ifg.len());
    let mut packed = vec![Complex::new(0.0, 0.0); array_length];
    for (j, i) in (izpd..ifg.len()).enumerate() {
        packed[j] = Complex::new(ifg[i], 0.0);
    }
    for (j, i) in (0..izpd).enumerate() {
        packed[array_length - izpd + j] = Complex::new(ifg[i], 0.0);
    }
    packed
}

/// Normalized inverse FFT, keeping the non-negative-frequency half.
fn half_ifft(planner: &mut FftPlanner<f64>, mut data: Vec<Complex<f64>>) -> Array1<Complex<f64>> {
    let m = data.len();
    let fft = planner.plan_fft_inverse(m);
    fft.process(&mut data);
    let scale = 1.0 / m as f64;
    data.truncate(m / 2);
    Array1::from_iter(data.into_iter().map(|c| c * scale))
}

fn phase_of_spc(spc: &Array1<Complex<f64>>) -> Array1<f64> {
    spc.mapv(|c| c.arg() + PI)
}

/// Replace phase points whose spectrum magnitude is below `threshold` by
/// linear interpolation over the above-threshold points.
fn interpolate_phase(
    threshold: f64,
    phase_spc: &Array1<Complex<f64>>,
    mut phase: Array1<f64>,
) -> Array1<f64> {
    let below: Vec<usize> = phase_spc
        .iter()
        .enumerate()
        .filter(|(_, c)| c.norm() < threshold)
        .map(|(i, _)| i)
        .collect();
    if below.is_empty() {
        return phase;
    }
    let above: Vec<usize> = phase_spc
        .iter()
        .enumerate()
        .filter(|(_, c)| c.norm() >= threshold)
        .map(|(i, _)| i)
        .collect();
    if above.is_empty() {
        log::warn!("entire low-resolution phase spectrum is below threshold, leaving phase as-is");
        return phase;
    }

    let xs: Vec<f64> = above.iter().map(|&i| i as f64).collect();
    let ys: Vec<f64> = above.iter().map(|&i| phase[i]).collect();
    let interp = LinearInterp::new(true);
    for &i in &below {
        if let Ok(v) = interp.interp1d(&xs, &ys, i as f64) {
            phase[i] = v;
        }
    }
    phase
}

/// Triangular ramp apodization rising over `2 * zpd` samples, flat at 1
/// beyond.
fn ramp_ifg(ifg: &Array1<f64>, zpd: f64) -> Array1<f64> {
    let ramp_length = 2.0 * zpd;
    if ramp_length <= 0.0 {
        return ifg.clone();
    }
    Array1::from_iter(ifg.iter().enumerate().map(|(i, &v)| {
        if (i as f64) <= ramp_length {
            v * i as f64 / ramp_length
        } else {
            v
        }
    }))
}

/// Combine the uncorrected complex spectrum with the low-resolution phase:
/// the real Mertz spectrum and the phase-rotated complex spectrum.
fn mertz_correction(
    spc_uncorr: &Array1<Complex<f64>>,
    phase_highres: &Array1<f64>,
    phase: &Array1<f64>,
) -> (Array1<f64>, Array1<Complex<f64>>) {
    let spc = Array1::from_iter(
        spc_uncorr
            .iter()
            .zip(phase_highres.iter())
            .zip(phase.iter())
            .map(|((u, hi), lo)| u.norm() * (hi - lo).cos()),
    );
    let cplx = Array1::from_iter(
        spc_uncorr
            .iter()
            .zip(phase.iter())
            .map(|(u, lo)| u * Complex::from_polar(1.0, -lo)),
    );
    (spc, cplx)
}
