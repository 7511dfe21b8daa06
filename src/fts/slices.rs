//! Concatenating single-segment "slice" files from automated measurement
//! routines into one long interferogram.
use std::path::{Path, PathBuf};

use itertools::Itertools;
use ndarray::Array1;

use crate::fts::{FtsError, FtsFile, FtsOptions, FtsResult, Header};

/// The result of scanning a slice directory: one concatenated
/// interferogram plus the header of the first slice that parsed.
#[derive(Debug)]
pub struct SliceSet {
    pub header: Header,
    pub ifg: Array1<f64>,
    pub opd: Array1<f64>,
    /// Path of the first valid slice; its header and structure stand in
    /// for the whole set.
    pub first_slice: PathBuf,
    /// Everything skipped or noted while scanning the directory.
    pub events: Vec<String>,
}

/// Concatenate the interferograms of all slice files under `<dir>/scan`
/// in sorted filename order.
///
/// `.info` companions are ignored; files that fail to parse or carry no
/// `Data Block IgSm` are skipped with a logged event rather than failing
/// the set. Errors only when no usable slice remains. The default OPD
/// axis runs from 0 to `1.8 / RES`.
pub fn concatenate_slices(dir: &Path) -> FtsResult<SliceSet> {
    let scan_dir = dir.join("scan");
    let names: Vec<String> = std::fs::read_dir(&scan_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .sorted()
        .collect();

    let mut events = vec![];
    let mut pieces: Vec<Array1<f64>> = vec![];
    let mut first: Option<(PathBuf, Header)> = None;

    for name in names {
        if name.ends_with(".info") {
            continue;
        }
        let path = scan_dir.join(&name);
        let fts = match FtsFile::open(
            &path,
            FtsOptions {
                interferogram: true,
                ..Default::default()
            },
        ) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("skipping slice {name}: {e}");
                events.push(format!("Skipping slice {name}: {e}"));
                continue;
            }
        };
        let Some(ifg) = fts.ifg else {
            events.push(format!("Slice {name} has no interferogram block, skipping"));
            continue;
        };
        if first.is_none() {
            first = Some((path, fts.header));
        }
        pieces.push(ifg);
    }

    let Some((first_slice, header)) = first else {
        return Err(FtsError::NoSlices(dir.to_path_buf()));
    };

    let n: usize = pieces.iter().map(|p| p.len()).sum();
    let mut ifg = Vec::with_capacity(n);
    for piece in pieces {
        ifg.extend(piece.iter());
    }
    let ifg = Array1::from_vec(ifg);

    let res = header
        .get("Acquisition Parameters")
        .and_then(|block| block.get("RES"))
        .and_then(|value| value.as_float().ok())
        .ok_or_else(|| FtsError::MissingParameter {
            block: "Acquisition Parameters".to_string(),
            parameter: "RES".to_string(),
        })?;
    // OPD_max for a double-sided scan is 2 * 0.9 / RES
    let opd = Array1::linspace(0.0, 2.0 * 0.9 / res, ifg.len());

    events.push(format!(
        "Concatenated {} interferogram points from slices under {}",
        ifg.len(),
        scan_dir.display()
    ));

    Ok(SliceSet {
        header,
        ifg,
        opd,
        first_slice,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ifg_file;
    use approx::assert_abs_diff_eq;

    fn setup_slice_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fts-rs-slices-{}-{tag}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("scan")).unwrap();
        dir
    }

    #[test]
    fn test_concatenates_in_sorted_order() {
        let dir = setup_slice_dir("order");
        let scan = dir.join("scan");
        // Written out of order; sorted filename order must win
        std::fs::write(scan.join("b0000002.0"), ifg_file(&[4.0, 5.0, 6.0, 7.0], 15798.0))
            .unwrap();
        std::fs::write(scan.join("b0000001.0"), ifg_file(&[0.0, 1.0, 2.0, 3.0], 15798.0))
            .unwrap();
        std::fs::write(scan.join("b0000001.0.info"), b"not a slice").unwrap();
        std::fs::write(scan.join("junk.0"), b"\xFF\x00\x00\x00 definitely not opus").unwrap();

        let set = concatenate_slices(&dir).unwrap();
        assert_eq!(set.ifg.len(), 8);
        for (i, &v) in set.ifg.iter().enumerate() {
            assert_abs_diff_eq!(v, i as f64);
        }
        assert!(set.first_slice.ends_with("scan/b0000001.0"));
        assert_eq!(set.opd.len(), 8);
        assert_abs_diff_eq!(set.opd[0], 0.0);
        assert_abs_diff_eq!(set.opd[7], 2.0 * 0.9 / 0.9, epsilon = 1e-12);
        assert!(set.events.iter().any(|e| e.contains("junk.0")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_model_from_slices() {
        let dir = setup_slice_dir("model");
        let scan = dir.join("scan");
        std::fs::write(scan.join("a1.0"), ifg_file(&[0.0, 1.0], 15798.0)).unwrap();
        std::fs::write(scan.join("a2.0"), ifg_file(&[2.0, 3.0], 15798.0)).unwrap();

        let fts = FtsFile::from_slices(&dir).unwrap();
        assert_eq!(fts.ifg.as_ref().unwrap().len(), 4);
        assert_eq!(fts.ifgopd.as_ref().unwrap().len(), 4);
        // Header comes from the first valid slice
        assert_eq!(
            fts.header_value("Acquisition Parameters", "AQM")
                .unwrap()
                .as_str()
                .unwrap(),
            "SD"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_directory_errors() {
        let dir = setup_slice_dir("empty");
        let err = concatenate_slices(&dir).unwrap_err();
        assert!(matches!(err, FtsError::NoSlices(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
