use num_traits::Float;
use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum InterpolationError {
    #[error("Input arrays were different lengths (x.len() = {x_len}, y.len() = {y_len}")]
    InputLengthMismatch { x_len: usize, y_len: usize },
    #[error(
        "Input arrays were too short, needed at least {req_len} elements but got only {actual_len}"
    )]
    InputTooShort { req_len: usize, actual_len: usize },
    #[error(
        "Requested output coordinate ({out}) falls outside the input domain ({left} to {right})"
    )]
    OutOfDomain {
        left: String,
        right: String,
        out: String,
    },
}

pub trait InterpolationMethod {
    fn interp1d<F: Float + Debug>(
        &self,
        input_x: &[F],
        input_y: &[F],
        output_x: F,
    ) -> Result<F, InterpolationError>;

    /// Interpolate onto each coordinate of `output_x` in turn.
    fn interp1d_many<F: Float + Debug>(
        &self,
        input_x: &[F],
        input_y: &[F],
        output_x: &[F],
    ) -> Result<Vec<F>, InterpolationError> {
        output_x
            .iter()
            .map(|&x| self.interp1d(input_x, input_y, x))
            .collect()
    }

    fn check_1d_inputs<F: Float + Debug>(
        &self,
        input_x: &[F],
        input_y: &[F],
        output_x: F,
        must_be_in_bounds: bool,
        min_len: usize,
    ) -> Result<(), InterpolationError> {
        if input_x.len() != input_y.len() {
            return Err(InterpolationError::InputLengthMismatch {
                x_len: input_x.len(),
                y_len: input_y.len(),
            });
        }

        // Now we know both are the same length, so only need to test 1
        if input_x.len() < min_len {
            return Err(InterpolationError::InputTooShort {
                req_len: min_len,
                actual_len: input_x.len(),
            });
        }

        if must_be_in_bounds {
            let left_bound = if let Some(x) = input_x.iter().copied().reduce(F::min) {
                x
            } else {
                // We only get None if the input is empty. If we got here, the min_len must have been 0, which means
                // the interpolator must handle the 0 length case
                return Ok(());
            };

            // If left bound was Some, this must also be Some.
            let right_bound = input_x
                .iter()
                .copied()
                .reduce(F::max)
                .expect("input_x.max() should return Some if input_x.min() returned Some()");

            if output_x < left_bound || output_x > right_bound {
                return Err(InterpolationError::OutOfDomain {
                    left: format!("{left_bound:?}"),
                    right: format!("{right_bound:?}"),
                    out: format!("{output_x:?}"),
                });
            }
        }

        Ok(())
    }
}

/// Piecewise-linear interpolation over an ascending coordinate array.
///
/// With `clamp_ends = true`, coordinates outside the input domain take the
/// first/last input value rather than erroring; this matches the endpoint
/// behavior spectra resampling expects.
pub struct LinearInterp {
    clamp_ends: bool,
}

impl LinearInterp {
    pub fn new(clamp_ends: bool) -> Self {
        Self { clamp_ends }
    }
}

impl InterpolationMethod for LinearInterp {
    fn interp1d<F: Float + Debug>(
        &self,
        input_x: &[F],
        input_y: &[F],
        output_x: F,
    ) -> Result<F, InterpolationError> {
        self.check_1d_inputs(input_x, input_y, output_x, !self.clamp_ends, 1)?;

        let n = input_x.len();
        if output_x <= input_x[0] {
            return Ok(input_y[0]);
        }
        if output_x >= input_x[n - 1] {
            return Ok(input_y[n - 1]);
        }

        // Bisect for the bracketing segment; input_x must be ascending.
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if input_x[mid] <= output_x {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let dx = input_x[hi] - input_x[lo];
        if dx == F::zero() {
            // Repeated abscissa, fall back to the left value
            return Ok(input_y[lo]);
        }
        let t = (output_x - input_x[lo]) / dx;
        Ok(input_y[lo] + t * (input_y[hi] - input_y[lo]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_error_checks() {
        let interpolator = LinearInterp::new(false);

        let err = interpolator.interp1d(&[1.0], &[1.0, 1.0], 2.0).unwrap_err();
        match err {
            InterpolationError::InputLengthMismatch { x_len, y_len } => {
                assert_eq!(x_len, 1, "x_len in error is incorrect");
                assert_eq!(y_len, 2, "y_len in error is incorrect");
            }
            _ => assert!(
                false,
                "Expected InputLengthMismatch error, did not get that"
            ),
        }

        let err = interpolator.interp1d(&[], &[], 2.0).unwrap_err();
        match err {
            InterpolationError::InputTooShort {
                req_len,
                actual_len,
            } => {
                assert_eq!(req_len, 1, "req_len in error is incorrect");
                assert_eq!(actual_len, 0, "actual_len in error is incorrect");
            }
            _ => assert!(false, "Expected InputTooShort error, did not get that"),
        }

        let err = interpolator
            .interp1d(&[1.0, 2.0], &[2.0, 4.0], 0.0)
            .unwrap_err();
        match err {
            InterpolationError::OutOfDomain {
                left: _,
                right: _,
                out: _,
            } => (),
            _ => assert!(false, "Expected OutOfDomain error, did not get that"),
        }
    }

    #[test]
    fn test_linear_interior() {
        let interpolator = LinearInterp::new(false);
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 4.0, 8.0];

        let y_out = interpolator
            .interp1d(x.as_slice(), y.as_slice(), 1.5)
            .unwrap();
        assert_abs_diff_eq!(y_out, 3.0);

        let y_out = interpolator
            .interp1d(x.as_slice(), y.as_slice(), 2.75)
            .unwrap();
        assert_abs_diff_eq!(y_out, 7.0);

        // Exactly on a grid point
        let y_out = interpolator
            .interp1d(x.as_slice(), y.as_slice(), 2.0)
            .unwrap();
        assert_abs_diff_eq!(y_out, 4.0);
    }

    #[test]
    fn test_linear_clamped_ends() {
        let interpolator = LinearInterp::new(true);
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 4.0, 8.0];

        let y_out = interpolator
            .interp1d(x.as_slice(), y.as_slice(), 0.0)
            .unwrap();
        assert_abs_diff_eq!(y_out, 2.0);

        let y_out = interpolator
            .interp1d(x.as_slice(), y.as_slice(), 10.0)
            .unwrap();
        assert_abs_diff_eq!(y_out, 8.0);
    }

    #[test]
    fn test_linear_many() {
        let interpolator = LinearInterp::new(true);
        let x = [0.0, 1.0];
        let y = [0.0, 10.0];
        let out = interpolator
            .interp1d_many(x.as_slice(), y.as_slice(), &[0.25, 0.5, 2.0])
            .unwrap();
        assert_abs_diff_eq!(out[0], 2.5);
        assert_abs_diff_eq!(out[1], 5.0);
        assert_abs_diff_eq!(out[2], 10.0);
    }
}
