//! Git object identifier
//!
//! Object ids are the raw digest of an object's canonical serialized form
//! (`<type> <size>\0<payload>`). SHA-1 repositories use 20-byte ids, SHA-256
//! repositories use 32-byte ids; the length is fixed per repository.
//!
//! ## Storage
//!
//! Loose objects live at `objects/<first-2-hex-chars>/<remaining-hex-chars>`.

use serde::{Serialize, Serializer};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Longest supported raw id (SHA-256)
pub const MAX_RAW_LENGTH: usize = 32;

/// Length of the abbreviated hex form
pub const SHORT_OID_LENGTH: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Raw digest length in bytes
    pub fn raw_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    /// Map the `extensions.objectformat` config value to an algorithm.
    pub fn from_object_format(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("sha256") {
            HashAlgorithm::Sha256
        } else {
            HashAlgorithm::Sha1
        }
    }

    /// Hash `parts` as one contiguous byte stream.
    pub fn digest(&self, parts: &[impl AsRef<[u8]>]) -> ObjectId {
        match self {
            HashAlgorithm::Sha1 => {
                let mut hasher = Sha1::new();
                parts.iter().for_each(|part| hasher.update(part.as_ref()));
                ObjectId::from_digest(&hasher.finalize())
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                parts.iter().for_each(|part| hasher.update(part.as_ref()));
                ObjectId::from_digest(&hasher.finalize())
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseObjectIdError {
    #[error("invalid object id length: {0}")]
    Length(usize),
    #[error("invalid object id characters: {0}")]
    Characters(String),
}

/// Git object identifier
///
/// Stored as raw bytes in a fixed buffer; unused trailing bytes stay zero so
/// the derived comparisons only ever see the meaningful prefix plus padding.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    bytes: [u8; MAX_RAW_LENGTH],
    len: u8,
}

impl ObjectId {
    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0; MAX_RAW_LENGTH];
        bytes[..digest.len()].copy_from_slice(digest);

        ObjectId {
            bytes,
            len: digest.len() as u8,
        }
    }

    /// The all-zero id for the given algorithm
    pub fn null(algorithm: HashAlgorithm) -> Self {
        ObjectId {
            bytes: [0; MAX_RAW_LENGTH],
            len: algorithm.raw_len() as u8,
        }
    }

    /// Build an id from raw digest bytes (20 or 32 of them)
    pub fn from_raw(raw: &[u8]) -> Result<Self, ParseObjectIdError> {
        match raw.len() {
            20 | 32 => Ok(Self::from_digest(raw)),
            len => Err(ParseObjectIdError::Length(len)),
        }
    }

    /// Parse and validate a full hexadecimal id (40 or 64 characters)
    pub fn try_parse(id: &str) -> Result<Self, ParseObjectIdError> {
        if id.len() != 40 && id.len() != 64 {
            return Err(ParseObjectIdError::Length(id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseObjectIdError::Characters(id.to_string()));
        }

        let raw = (0..id.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&id[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| ParseObjectIdError::Characters(id.to_string()))?;

        Self::from_raw(&raw)
    }

    /// Read a raw id of the algorithm's length from binary data
    ///
    /// Used when decoding tree entries and pack indexes.
    pub fn read_raw_from<R: io::Read + ?Sized>(
        reader: &mut R,
        algorithm: HashAlgorithm,
    ) -> io::Result<Self> {
        let mut bytes = [0; MAX_RAW_LENGTH];
        reader.read_exact(&mut bytes[..algorithm.raw_len()])?;

        Ok(ObjectId {
            bytes,
            len: algorithm.raw_len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        if self.len as usize == HashAlgorithm::Sha256.raw_len() {
            HashAlgorithm::Sha256
        } else {
            HashAlgorithm::Sha1
        }
    }

    pub fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Convert to the loose object path relative to `objects/`
    ///
    /// `abc123...` becomes `ab/c123...`
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 hex characters (standard git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.to_hex()[..SHORT_OID_LENGTH].to_string()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
