//! Patching parameter records and data blocks.
//!
//! All edits accumulate in a shadow buffer initialized lazily from the
//! original bytes; block offsets and lengths never change, so every patch
//! is an in-place splice and the rest of the file stays byte-identical.
use std::path::Path;

use crate::fts::bytes::encode_latin1;
use crate::fts::constants::{ParType, ParValue};
use crate::fts::structure::{self, RawParam};
use crate::fts::{FtsError, FtsFile, FtsResult};

impl FtsFile {
    /// Replace the values of header parameters in the write buffer.
    ///
    /// Each pair names an existing record; its payload is re-encoded
    /// according to the record's stored type and spliced in place. Failures
    /// on one parameter are logged to the event log and do not stop the
    /// remaining replacements.
    pub fn change_header_pars(&mut self, changes: &[(&str, ParValue)]) -> FtsResult<()> {
        self.ensure_buffer()?;
        for (key, value) in changes {
            match self.patch_param(key, value) {
                Ok(()) => {
                    self.push_event(format!("Replaced header parameter {key} in the write buffer"))
                }
                Err(e) => {
                    log::warn!("could not replace header parameter {key}: {e}");
                    self.push_event(format!(
                        "Error while replacing header parameter {key} in the write buffer: {e}"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Replace the named data block with `values` in the write buffer.
    ///
    /// The new array must have exactly the stored block length; a
    /// different size is refused and the buffer is left untouched.
    pub fn replace_datablock(&mut self, name: &str, values: &[f64]) -> FtsResult<()> {
        let desc = *self
            .structure
            .get(name)
            .ok_or_else(|| FtsError::BlockNotFound(name.to_string()))?;
        let old_len = desc.length.max(0) as usize;
        if old_len != values.len() {
            log::warn!(
                "old and new data blocks for {name} have different sizes ({old_len} vs {}), not doing anything",
                values.len()
            );
            self.push_event(
                "Old and new data blocks have different sizes, not doing anything ...".to_string(),
            );
            return Err(FtsError::SizeMismatch {
                old_len,
                new_len: values.len(),
            });
        }

        self.ensure_buffer()?;
        let start = desc.offset.max(0) as usize;
        let buf = self.new_buffer.as_mut().ok_or(FtsError::NotInitialized)?;
        if start + 4 * old_len > buf.len() {
            return Err(FtsError::Decode {
                what: "data block",
                offset: start as u64,
                cause: "block extends past the end of the file".to_string(),
            });
        }
        for (i, &v) in values.iter().enumerate() {
            buf[start + 4 * i..start + 4 * (i + 1)].copy_from_slice(&(v as f32).to_le_bytes());
        }
        self.push_event(format!("Replaced data block {name} in the write buffer"));
        Ok(())
    }

    /// The file as it currently stands: the patched buffer if any edits
    /// were made, otherwise the original bytes.
    pub fn to_bytes(&self) -> FtsResult<Vec<u8>> {
        match &self.new_buffer {
            Some(b) => Ok(b.clone()),
            None => self.source.read_all(),
        }
    }

    /// Write the (possibly patched) file to a new path. Existing files are
    /// never overwritten.
    pub fn save(&self, path: impl AsRef<Path>) -> FtsResult<()> {
        let path = path.as_ref();
        if path.exists() {
            log::warn!(
                "file already exists: {}, not doing anything ...",
                path.display()
            );
            return Err(FtsError::OverwriteRefused(path.to_path_buf()));
        }
        std::fs::write(path, self.to_bytes()?)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    fn ensure_buffer(&mut self) -> FtsResult<()> {
        if self.new_buffer.is_none() {
            self.new_buffer = Some(self.source.read_all()?);
        }
        Ok(())
    }

    fn patch_param(&mut self, key: &str, value: &ParValue) -> FtsResult<()> {
        let rec = self.locate_param(key)?;
        let payload = encode_payload(&rec, value)?;

        let mut spliced = Vec::with_capacity(8 + payload.len());
        let mut key_bytes = encode_latin1(&rec.key);
        key_bytes.resize(4, 0);
        spliced.extend_from_slice(&key_bytes[..4]);
        spliced.extend_from_slice(&rec.dtype.to_le_bytes());
        spliced.extend_from_slice(&rec.reclen.to_le_bytes());
        spliced.extend(payload);

        let start = rec.offset as usize;
        let buf = self.new_buffer.as_mut().ok_or(FtsError::NotInitialized)?;
        if start + spliced.len() > buf.len() {
            return Err(FtsError::Decode {
                what: "parameter record",
                offset: rec.offset,
                cause: "record extends past the end of the file".to_string(),
            });
        }
        buf[start..start + spliced.len()].copy_from_slice(&spliced);
        Ok(())
    }

    /// Find the record for `key` with its location metadata, re-walking the
    /// block that holds it.
    fn locate_param(&mut self, key: &str) -> FtsResult<RawParam> {
        let block_name = self
            .search_header(key)
            .into_iter()
            .next()
            .map(str::to_string)
            .ok_or_else(|| FtsError::MissingParameter {
                block: "<any>".to_string(),
                parameter: key.to_string(),
            })?;
        let desc = *self
            .structure
            .get(&block_name)
            .ok_or_else(|| FtsError::BlockNotFound(block_name.clone()))?;

        let mut scratch = vec![];
        let mut rdr = self.source.reader()?;
        let records =
            structure::read_param_block_full(&mut rdr, desc.offset.max(0) as u64, &mut scratch)?;
        drop(rdr);
        self.events.extend(scratch);

        records
            .into_iter()
            .find(|r| r.key == key)
            .ok_or(FtsError::MissingParameter {
                block: block_name,
                parameter: key.to_string(),
            })
    }
}

fn encode_payload(rec: &RawParam, value: &ParValue) -> FtsResult<Vec<u8>> {
    let expected = ParType::from(rec.dtype);
    match (expected, value) {
        (ParType::Integer, ParValue::Integer(i)) => Ok(i.to_le_bytes().to_vec()),
        (ParType::Float, ParValue::Float(f)) => Ok(f.to_le_bytes().to_vec()),
        (ParType::String, ParValue::Str(s)) => {
            // NUL-pad to the stored record length; longer strings are cut
            let mut payload = encode_latin1(s);
            payload.resize(2 * rec.reclen as usize, 0);
            Ok(payload)
        }
        _ => Err(FtsError::EncodeMismatch {
            key: rec.key.clone(),
            expected,
            given: value.par_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fts::FtsOptions;
    use crate::test_utils::{minimal_spectrum_file, spectrum_file_with_ifg};
    use approx::assert_abs_diff_eq;

    fn parse(data: Vec<u8>) -> FtsFile {
        FtsFile::from_bytes(data, FtsOptions::default()).unwrap()
    }

    #[test]
    fn test_unpatched_round_trip() {
        let data = minimal_spectrum_file();
        let fts = parse(data.clone());
        assert_eq!(fts.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_patch_string_locality() {
        let data = spectrum_file_with_ifg();
        let mut fts = parse(data.clone());
        fts.change_header_pars(&[("AQM", ParValue::Str("DD".to_string()))])
            .unwrap();

        let patched = fts.to_bytes().unwrap();
        assert_eq!(patched.len(), data.len());
        let diffs: Vec<usize> = data
            .iter()
            .zip(patched.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        // "SD" -> "DD" flips exactly one byte
        assert_eq!(diffs.len(), 1);

        let reparsed = parse(patched);
        assert_eq!(
            reparsed
                .header_value("Acquisition Parameters", "AQM")
                .unwrap()
                .as_str()
                .unwrap(),
            "DD"
        );
    }

    #[test]
    fn test_patch_float_and_integer() {
        let data = minimal_spectrum_file();
        let mut fts = parse(data.clone());
        fts.change_header_pars(&[
            ("FXV", ParValue::Float(2000.0)),
            ("NPT", ParValue::Integer(3)),
        ])
        .unwrap();

        let patched = fts.to_bytes().unwrap();
        assert_eq!(patched.len(), data.len());
        let reparsed = parse(patched);
        assert_abs_diff_eq!(
            reparsed
                .header_value("Data Parameters SpSm", "FXV")
                .unwrap()
                .as_float()
                .unwrap(),
            2000.0
        );
        assert_eq!(
            reparsed
                .header_value("Data Parameters SpSm", "NPT")
                .unwrap()
                .as_integer()
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_overlong_string_is_truncated() {
        let data = spectrum_file_with_ifg();
        let mut fts = parse(data.clone());
        // AQM was stored with reclen 2 (4 payload bytes): room for 4 chars
        fts.change_header_pars(&[("AQM", ParValue::Str("ABCDEFGH".to_string()))])
            .unwrap();
        let reparsed = parse(fts.to_bytes().unwrap());
        assert_eq!(
            reparsed
                .header_value("Acquisition Parameters", "AQM")
                .unwrap()
                .as_str()
                .unwrap(),
            "ABCD"
        );
    }

    #[test]
    fn test_type_mismatch_is_logged_not_fatal() {
        let data = minimal_spectrum_file();
        let mut fts = parse(data.clone());
        // FXV is a float record: an integer value cannot be encoded into it
        fts.change_header_pars(&[("FXV", ParValue::Integer(5))])
            .unwrap();
        assert!(fts
            .events()
            .iter()
            .any(|e| e.contains("Error while replacing header parameter FXV")));
        // Buffer must be untouched
        assert_eq!(fts.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_missing_parameter_is_logged_not_fatal() {
        let data = minimal_spectrum_file();
        let mut fts = parse(data.clone());
        fts.change_header_pars(&[("ZZZ", ParValue::Integer(1))])
            .unwrap();
        assert!(fts
            .events()
            .iter()
            .any(|e| e.contains("Error while replacing header parameter ZZZ")));
        assert_eq!(fts.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_replace_datablock() {
        let data = minimal_spectrum_file();
        let mut fts = parse(data.clone());
        fts.replace_datablock("Data Block SpSm", &[4.0, 5.0, 6.0, 7.0])
            .unwrap();

        let patched = fts.to_bytes().unwrap();
        // File length is preserved exactly
        assert_eq!(patched.len(), data.len());
        let reparsed = parse(patched);
        let db = reparsed.get_block("Data Block SpSm").unwrap().unwrap();
        assert_abs_diff_eq!(db.yaxis[0], 4.0);
        assert_abs_diff_eq!(db.yaxis[3], 7.0);
    }

    #[test]
    fn test_replace_datablock_size_mismatch() {
        let data = minimal_spectrum_file();
        let mut fts = parse(data.clone());
        let err = fts
            .replace_datablock("Data Block SpSm", &[1.0, 2.0])
            .unwrap_err();
        assert!(matches!(
            err,
            FtsError::SizeMismatch {
                old_len: 4,
                new_len: 2
            }
        ));
        // Refusal means no-op
        assert_eq!(fts.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = std::env::temp_dir().join(format!("fts-rs-writer-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("patched.0");
        let _ = std::fs::remove_file(&target);

        let fts = parse(minimal_spectrum_file());
        fts.save(&target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), minimal_spectrum_file());

        let err = fts.save(&target).unwrap_err();
        assert!(matches!(err, FtsError::OverwriteRefused(_)));

        let _ = std::fs::remove_file(&target);
        let _ = std::fs::remove_dir(&dir);
    }
}
