//! Access to the header, interferogram, and spectrum data blocks of OPUS
//! files written by Fourier-Transform Infrared Spectrometers.
//!
//! An OPUS file is a structural directory followed by parameter blocks
//! (keyed short records) and data blocks (flat arrays of 32-bit floats).
//! [`FtsFile`] parses the directory and header eagerly, reads data blocks
//! on request, and accumulates patches in a shadow buffer that can be
//! saved to a new file; the original file is never mutated in place.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ndarray::{s, Array1};

use crate::fts::bytes::ByteSource;
use crate::fts::constants::{ParType, ParValue};

pub mod bytes;
pub mod constants;
pub mod slices;
pub(crate) mod structure;
mod writer;

pub type FtsResult<T> = Result<T, FtsError>;

#[derive(Debug, thiserror::Error)]
pub enum FtsError {
    #[error("Bad magic number in {}: not an OPUS file", .0.display())]
    BadMagic(PathBuf),
    #[error("Error reading from OPUS file: {0}")]
    Io(#[from] std::io::Error),
    #[error("File model was not successfully initialized")]
    NotInitialized,
    #[error("Block {0:?} not present in the file")]
    BlockNotFound(String),
    #[error("Parameter {parameter} not found in block {block:?}")]
    MissingParameter { block: String, parameter: String },
    #[error("Could not decode {what} at byte {offset}: {cause}")]
    Decode {
        what: &'static str,
        offset: u64,
        cause: String,
    },
    #[error("Cannot encode a {given} value into the {expected} record for parameter {key}")]
    EncodeMismatch {
        key: String,
        expected: ParType,
        given: ParType,
    },
    #[error(
        "New data block length ({new_len}) differs from stored length ({old_len}), leaving the buffer untouched"
    )]
    SizeMismatch { old_len: usize, new_len: usize },
    #[error("Refusing to overwrite existing file {}", .0.display())]
    OverwriteRefused(PathBuf),
    #[error("No usable slices found under {}", .0.display())]
    NoSlices(PathBuf),
}

/// A parameter value did not hold the requested type.
#[derive(Debug, thiserror::Error)]
#[error("Expected a {expected} parameter value, got {actual}")]
pub struct TypeMismatchError {
    pub expected: ParType,
    pub actual: ParType,
}

/// One entry of the block directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub type1: u8,
    pub type2: u8,
    /// Length in native units: records for parameter blocks, 4-byte floats
    /// for data blocks.
    pub length: i32,
    /// Byte offset from the start of the file.
    pub offset: i32,
}

/// Parameters of one header block, in record order.
pub type ParamBlock = IndexMap<String, ParValue>;

/// The decoded header: block name -> parameter key -> value, both levels
/// in file order.
pub type Header = IndexMap<String, ParamBlock>;

/// A data block read from the file, with its derived wavenumber axis when
/// one is defined (interferograms have none).
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub xaxis: Option<Array1<f64>>,
    pub yaxis: Array1<f64>,
}

/// Which data blocks to materialize eagerly at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct FtsOptions {
    pub spectrum: bool,
    pub transmittance: bool,
    pub phase: bool,
    pub interferogram: bool,
    pub second_interferogram: bool,
}

/// One difference between two decoded headers.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderDiff {
    ValueDiffers {
        block: String,
        key: String,
        ours: ParValue,
        theirs: ParValue,
    },
    KeyMissing { block: String, key: String },
    BlockMissing { block: String },
}

/// A parsed OPUS file.
///
/// The model holds the file path (or the whole payload for in-memory
/// sources), the block directory, and the decoded header; requested data
/// blocks are stored on the corresponding fields. All diagnostics are
/// appended to an event log retrievable with [`FtsFile::events`].
#[derive(Debug)]
pub struct FtsFile {
    pub path: PathBuf,
    pub(crate) source: ByteSource,
    /// False once initialization has failed; named block reads then fail
    /// with [`FtsError::NotInitialized`].
    pub status: bool,
    events: Vec<String>,
    /// Block directory in file order, keyed by canonical name.
    pub structure: IndexMap<String, BlockDescriptor>,
    pub header: Header,
    pub spc: Option<Array1<f64>>,
    pub spcwvn: Option<Array1<f64>>,
    pub trm: Option<Array1<f64>>,
    pub trmwvn: Option<Array1<f64>>,
    pub pha: Option<Array1<f64>>,
    pub phawvn: Option<Array1<f64>>,
    pub ifg: Option<Array1<f64>>,
    pub ifgopd: Option<Array1<f64>>,
    pub ifg2: Option<Array1<f64>>,
    pub ifgopd2: Option<Array1<f64>>,
    pub(crate) new_buffer: Option<Vec<u8>>,
}

impl FtsFile {
    /// Parse the file at `path`, materializing the data blocks selected in
    /// `opts`.
    pub fn open(path: impl Into<PathBuf>, opts: FtsOptions) -> FtsResult<Self> {
        let path = path.into();
        let source = ByteSource::Disk(path.clone());
        Self::parse(source, path, opts)
    }

    /// Parse an OPUS file held entirely in memory.
    pub fn from_bytes(data: Vec<u8>, opts: FtsOptions) -> FtsResult<Self> {
        let source = ByteSource::Memory(data);
        Self::parse(source, PathBuf::from("<memory>"), opts)
    }

    /// Build a model from a directory of slice files, concatenating their
    /// interferograms in sorted filename order.
    ///
    /// The header (and block directory) of the first valid slice becomes
    /// the model's; the interferogram is the concatenation over all valid
    /// slices with a default OPD axis derived from the `RES` parameter.
    pub fn from_slices(dir: impl AsRef<Path>) -> FtsResult<Self> {
        let set = slices::concatenate_slices(dir.as_ref())?;
        let mut fts = Self::open(&set.first_slice, FtsOptions::default())?;
        fts.events.extend(set.events);
        fts.ifg = Some(set.ifg);
        fts.ifgopd = Some(set.opd);
        Ok(fts)
    }

    fn parse(source: ByteSource, path: PathBuf, opts: FtsOptions) -> FtsResult<Self> {
        if !bytes::check_magic(&source)? {
            log::warn!("bad magic in {}", path.display());
            return Err(FtsError::BadMagic(path));
        }

        let mut events = vec!["Reading structure of file".to_string()];
        let mut reader = source.reader()?;
        let fs = structure::read_structure(&mut reader, &mut events)?;

        events.push("Reading header ...".to_string());
        let mut header = Header::new();
        for (name, desc) in fs.iter() {
            if !is_param_block(name) || desc.length <= 0 {
                continue;
            }
            events.push(format!("Reading header block: {name}"));
            match structure::read_param_block(&mut reader, desc.offset.max(0) as u64, &mut events)
            {
                Ok(params) => {
                    header.insert(name.clone(), params);
                }
                Err(e) => {
                    log::warn!("could not decode header block {name}: {e}");
                    events.push(format!("Error reading header block {name}: {e}"));
                }
            }
        }
        drop(reader);

        let mut fts = FtsFile {
            path,
            source,
            status: true,
            events,
            structure: fs,
            header,
            spc: None,
            spcwvn: None,
            trm: None,
            trmwvn: None,
            pha: None,
            phawvn: None,
            ifg: None,
            ifgopd: None,
            ifg2: None,
            ifgopd2: None,
            new_buffer: None,
        };
        fts.materialize(&opts)?;
        Ok(fts)
    }

    fn materialize(&mut self, opts: &FtsOptions) -> FtsResult<()> {
        if opts.spectrum {
            if let Some(db) = self.get_block("Data Block SpSm")? {
                self.spcwvn = db.xaxis;
                self.spc = Some(db.yaxis);
            } else if let Some(db) = self.get_block("Data Block ScSm")? {
                self.push_event("Using ScSm data in place of SpSm");
                self.spcwvn = db.xaxis;
                self.spc = Some(db.yaxis);
            } else {
                self.push_event("No spectrum found ... skipping");
            }
        }
        if opts.transmittance {
            if let Some(db) = self.get_block("Data Block TrSm")? {
                self.trmwvn = db.xaxis;
                self.trm = Some(db.yaxis);
            } else {
                self.push_event("No transmittance spectrum found ... skipping");
            }
        }
        if opts.phase {
            if let Some(db) = self.get_block("Data Block PhSm")? {
                self.phawvn = db.xaxis;
                self.pha = Some(db.yaxis);
            } else {
                self.push_event("No phase spectrum found ... skipping");
            }
        }
        if opts.interferogram || opts.second_interferogram {
            if let Some(db) = self.get_block("Data Block IgSm")? {
                self.ifgopd = db.xaxis;
                self.ifg = Some(db.yaxis);
            } else {
                self.push_event("No interferogram found ... skipping");
            }
        }
        if opts.second_interferogram {
            if let Some(db) = self.get_block("Data Block IgSm/2.Chn.")? {
                self.ifgopd2 = db.xaxis;
                self.ifg2 = Some(db.yaxis);
            } else {
                self.push_event("No second-channel interferogram found ... skipping");
            }
        }
        Ok(())
    }

    /// Whether the directory contains a block with this canonical name.
    pub fn has_block(&self, name: &str) -> bool {
        self.structure.contains_key(name)
    }

    /// Read the named data block and derive its wavenumber axis.
    ///
    /// Returns `Ok(None)` when the block is absent. When the companion
    /// `Data Parameters <suffix>` block carries `NPT` smaller than the
    /// stored length, the trailing floats are physical padding and are
    /// discarded. Interferogram (`IgSm`) blocks get no x axis.
    pub fn get_block(&self, name: &str) -> FtsResult<Option<DataBlock>> {
        if !self.status {
            return Err(FtsError::NotInitialized);
        }
        let Some(desc) = self.structure.get(name) else {
            return Ok(None);
        };

        let raw = self.read_data_block(desc)?;
        let suffix = name.split(' ').last().unwrap_or(name);
        let data_params = self.header.get(&format!("Data Parameters {suffix}"));

        let npt = data_params
            .and_then(|b| b.get("NPT"))
            .and_then(|v| v.as_integer().ok())
            .and_then(|n| usize::try_from(n).ok());
        let yaxis = match npt {
            Some(n) if n < raw.len() => raw.slice(s![..n]).to_owned(),
            _ => raw,
        };

        let xaxis = if suffix == "IgSm" {
            None
        } else if let Some(block) = data_params {
            match (
                block.get("FXV").and_then(|v| v.as_float().ok()),
                block.get("LXV").and_then(|v| v.as_float().ok()),
                npt,
            ) {
                (Some(fxv), Some(lxv), Some(n)) => Some(Array1::linspace(fxv, lxv, n)),
                _ => None,
            }
        } else {
            None
        };

        Ok(Some(DataBlock { xaxis, yaxis }))
    }

    fn read_data_block(&self, desc: &BlockDescriptor) -> FtsResult<Array1<f64>> {
        let mut rdr = self.source.reader()?;
        rdr.seek_to(desc.offset.max(0) as u64)?;
        let n = desc.length.max(0) as usize;
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(rdr.read_f32()? as f64);
        }
        Ok(Array1::from_vec(values))
    }

    /// The value of `key` inside the named header block.
    pub fn header_value(&self, block: &str, key: &str) -> Option<&ParValue> {
        self.header.get(block)?.get(key)
    }

    /// The value of `key` from whichever block holds it first.
    pub fn find_header_value(&self, key: &str) -> Option<&ParValue> {
        let block = self.search_header(key).into_iter().next()?;
        self.header[block].get(key)
    }

    /// Names of all header blocks containing parameter `key`, in file order.
    pub fn search_header(&self, key: &str) -> Vec<&str> {
        self.header
            .iter()
            .filter(|(_, params)| params.contains_key(key))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The forward branch of a double-sided interferogram: its first half.
    ///
    /// Requires the interferogram to be loaded and one good forward scan
    /// (`GFW` = 1).
    pub fn fwdifg(&self) -> Option<Array1<f64>> {
        let ifg = self.ifg.as_ref()?;
        let gfw = self
            .header_value("Instrument Parameters", "GFW")?
            .as_integer()
            .ok()?;
        if gfw == 1 {
            Some(ifg.slice(s![..ifg.len() / 2]).to_owned())
        } else {
            None
        }
    }

    /// The backward branch of a double-sided interferogram: its second
    /// half, reversed so the burst runs the same way as the forward branch.
    pub fn bwdifg(&self) -> Option<Array1<f64>> {
        let ifg = self.ifg.as_ref()?;
        let gbw = self
            .header_value("Instrument Parameters", "GBW")?
            .as_integer()
            .ok()?;
        if gbw == 1 {
            Some(ifg.slice(s![ifg.len() / 2..;-1]).to_owned())
        } else {
            None
        }
    }

    /// Everything that has happened to this model, in order.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub(crate) fn push_event(&mut self, msg: impl Into<String>) {
        self.events.push(msg.into());
    }

    /// Compare this model's header with another, reporting every
    /// parameter that differs or is missing on the other side.
    pub fn compare_headers(&self, other: &Header) -> Vec<HeaderDiff> {
        let mut diffs = vec![];
        for (block, params) in self.header.iter() {
            let Some(other_params) = other.get(block) else {
                diffs.push(HeaderDiff::BlockMissing {
                    block: block.clone(),
                });
                continue;
            };
            for (key, value) in params.iter() {
                match other_params.get(key) {
                    Some(other_value) if other_value == value => (),
                    Some(other_value) => diffs.push(HeaderDiff::ValueDiffers {
                        block: block.clone(),
                        key: key.clone(),
                        ours: value.clone(),
                        theirs: other_value.clone(),
                    }),
                    None => diffs.push(HeaderDiff::KeyMissing {
                        block: block.clone(),
                        key: key.clone(),
                    }),
                }
            }
        }
        diffs
    }
}

/// Whether a directory entry names a decodable parameter block.
///
/// Data blocks are flat float arrays, `something`/unknown blocks have no
/// record structure worth walking.
fn is_param_block(name: &str) -> bool {
    !name.starts_with("Data Block") && !name.contains("unknown") && !name.contains("something")
}
