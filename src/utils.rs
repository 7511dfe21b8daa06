//! General numeric utilities, not particular to any one processing step.
use ndarray::Array1;

/// The smallest power of two that is >= `n`.
///
/// This is the array length the FFT operates on before zero filling
/// is applied; `n` must be > 0.
pub fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Index of the first maximum value in `a`, or `None` for an empty array.
pub fn argmax(a: &Array1<f64>) -> Option<usize> {
    a.iter()
        .enumerate()
        .fold(None, |acc: Option<(usize, f64)>, (i, &v)| match acc {
            Some((_, best)) if v <= best => acc,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Index of the first minimum value in `a`, or `None` for an empty array.
pub fn argmin(a: &Array1<f64>) -> Option<usize> {
    a.iter()
        .enumerate()
        .fold(None, |acc: Option<(usize, f64)>, (i, &v)| match acc {
            Some((_, best)) if v >= best => acc,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Index of the first maximum of `|a|`.
pub fn argmax_abs(a: &Array1<f64>) -> Option<usize> {
    argmax(&a.mapv(f64::abs))
}

/// The non-negative frequencies of an `n`-point DFT with sample spacing `d`,
/// i.e. `k / (n * d)` for `k` in `0..n/2`.
///
/// Matches the first half of the usual `fftfreq` ordering for even `n`.
pub fn fftfreq_half(n: usize, d: f64) -> Array1<f64> {
    let denom = n as f64 * d;
    Array1::from_iter((0..n / 2).map(|k| k as f64 / denom))
}
