/// Reading, inspecting, and patching OPUS FTS files
pub mod fts;
/// Transforming interferograms into spectra with Mertz phase correction
pub mod mertz;
/// Batch operations (averaging, ratioing, ASCII export) over parsed files
pub mod batch;
/// Utilities related to interpolation
pub mod interpolation;
/// Console logging setup shared by the CLI tools
pub mod logging;
/// Small numeric helpers shared across modules
pub mod utils;

#[cfg(test)]
mod test_utils;
