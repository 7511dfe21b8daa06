//! Constants and lookup tables for the OPUS block directory and
//! parameter records.
use std::fmt::Display;

use crate::fts::TypeMismatchError;

/// Magic number at byte 0 of every OPUS file.
pub const MAGIC: [u8; 4] = [0x0A, 0x0A, 0xFE, 0xFE];

/// Byte length of the fixed file header preceding the first block.
pub const HEADER_LEN: usize = 24;

/// Byte length of one directory entry.
pub const DIR_ENTRY_LEN: usize = 12;

/// Parameter type of 4-byte integer
pub const TYPE_I4: u16 = 0;

/// Parameter type of 8-byte float
pub const TYPE_R8: u16 = 1;

/// Parameter type of string
pub const TYPE_STRING: u16 = 2;

/// Parameter type of string "enum"
pub const TYPE_ENUM: u16 = 3;

/// Parameter type of string "senum"
pub const TYPE_SENUM: u16 = 4;

/// Primary block tag from the first directory type code.
pub fn primary_block_name(type1: u8) -> Option<&'static str> {
    match type1 {
        160 => Some("Sample Parameters"),
        23 => Some("Data Parameters"),
        96 => Some("Optic Parameters"),
        64 => Some("FT Parameters"),
        48 => Some("Acquisition Parameters"),
        31 => Some("Data Parameters"),
        32 => Some("Instrument Parameters"),
        15 => Some("Data Block"),
        7 => Some("Data Block"),
        0 => Some("something"),
        _ => None,
    }
}

/// Secondary block tag from the second directory type code, differentiating
/// spectra, interferograms, and so on.
///
/// 0x84 and 0x88 would also mark second-channel spectrum/interferogram data,
/// but they collide with 132 (ScSm) and 136 (IgSm/2.Chn.) and the first
/// binding wins.
pub fn secondary_block_suffix(type2: u8) -> Option<&'static str> {
    match type2 {
        132 => Some(" ScSm"),
        4 => Some(" SpSm"),
        8 => Some(" IgSm"),
        136 => Some(" IgSm/2.Chn."),
        20 => Some(" TrSm"),
        12 => Some(" PhSm"),
        _ => None,
    }
}

/// The canonical name a directory entry is filed under.
///
/// Unrecognized primary tags and tag 0 get a ` len <N>` suffix so that
/// otherwise-colliding entries remain distinct in the block table.
pub fn canonical_block_name(type1: u8, type2: u8, length: i32) -> String {
    let mut name = match primary_block_name(type1) {
        Some(n) => n.to_string(),
        None => format!("[unknown block {type1}]"),
    };
    if let Some(suffix) = secondary_block_suffix(type2) {
        name.push_str(suffix);
    }
    if type1 == 0 || primary_block_name(type1).is_none() {
        name.push_str(&format!(" len {length:3}"));
    }
    name
}

/// The decoded type of one parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParType {
    Integer,
    Float,
    String,
    Unknown(u16),
}

impl From<u16> for ParType {
    fn from(value: u16) -> Self {
        match value {
            TYPE_I4 => Self::Integer,
            TYPE_R8 => Self::Float,
            TYPE_STRING | TYPE_ENUM | TYPE_SENUM => Self::String,
            _ => Self::Unknown(value),
        }
    }
}

impl Display for ParType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParType::Integer => write!(f, "integer"),
            ParType::Float => write!(f, "float"),
            ParType::String => write!(f, "string"),
            ParType::Unknown(i) => write!(f, "unknown({i})"),
        }
    }
}

/// A decoded parameter value from a header block.
#[derive(Debug, Clone, PartialEq)]
pub enum ParValue {
    Integer(i32),
    Float(f64),
    Str(String),
}

impl ParValue {
    pub fn as_integer(&self) -> Result<i32, TypeMismatchError> {
        if let Self::Integer(i) = self {
            Ok(*i)
        } else {
            Err(TypeMismatchError {
                expected: ParType::Integer,
                actual: self.par_type(),
            })
        }
    }

    pub fn as_float(&self) -> Result<f64, TypeMismatchError> {
        match self {
            Self::Float(f) => Ok(*f),
            // Integer parameters read cleanly as floats; resolution and
            // laser wavenumber are occasionally stored either way.
            Self::Integer(i) => Ok(*i as f64),
            Self::Str(_) => Err(TypeMismatchError {
                expected: ParType::Float,
                actual: self.par_type(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeMismatchError> {
        if let Self::Str(s) = self {
            Ok(s)
        } else {
            Err(TypeMismatchError {
                expected: ParType::String,
                actual: self.par_type(),
            })
        }
    }

    pub fn par_type(&self) -> ParType {
        match self {
            ParValue::Integer(_) => ParType::Integer,
            ParValue::Float(_) => ParType::Float,
            ParValue::Str(_) => ParType::String,
        }
    }
}

impl Display for ParValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParValue::Integer(i) => write!(f, "{i}"),
            ParValue::Float(v) => write!(f, "{v}"),
            ParValue::Str(s) => write!(f, "{s}"),
        }
    }
}
