//! Pack file (`.pack`) reader
//!
//! ## Format
//!
//! ```text
//! PACK | version (2 or 3) | object count | entry* | trailer hash
//! ```
//!
//! Each entry starts with a variable-length header: the first byte holds a
//! continuation bit, a 3-bit type and the low 4 bits of the inflated size;
//! following bytes add 7 size bits each. Delta entries then name their base
//! (a negative relative offset for ofs-delta, a full id for ref-delta) and
//! every entry ends with a zlib stream of exactly the declared size.

use crate::artifacts::objects::object::RawObject;
use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::delta::MAX_PREALLOCATION;
use crate::artifacts::pack::pack_index::PackIndex;
use crate::errors::{GitError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

const PACK_SIGNATURE: &[u8; 4] = b"PACK";
const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

/// Upper bound on delta links followed for one object
pub const MAX_DELTA_CHAIN: usize = 10_000;

/// Where a delta chain bottoms out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBase {
    /// A full object stored in this pack
    Object(RawObject),
    /// A ref-delta base that this pack does not contain
    External(ObjectId),
}

/// Deltas collected while walking from an entry towards its base
///
/// `deltas[0]` produces the requested object; the last delta applies directly
/// to the base.
#[derive(Debug, Clone)]
pub struct DeltaChain {
    pub base: ChainBase,
    pub deltas: Vec<Bytes>,
}

#[derive(Debug)]
pub struct PackFile {
    path: PathBuf,
    index: PackIndex,
    algorithm: HashAlgorithm,
}

enum EntryKind {
    Base(ObjectType),
    OfsDelta(u64),
    RefDelta(ObjectId),
}

fn corrupt_pack(path: &Path, reason: impl Into<String>) -> GitError {
    GitError::CorruptPack {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

impl PackFile {
    /// Open the pack that belongs to `index_path` (`pack-*.idx` → `pack-*.pack`).
    pub fn open(index_path: &Path, algorithm: HashAlgorithm) -> Result<Self> {
        let index_data = std::fs::read(index_path)?;
        let index = PackIndex::parse(&index_data, algorithm)
            .map_err(|reason| corrupt_pack(index_path, reason))?;

        let path = index_path.with_extension("pack");
        let mut file = File::open(&path)?;
        let mut signature = [0; 4];
        file.read_exact(&mut signature)
            .map_err(|_| corrupt_pack(&path, "truncated pack header"))?;
        if &signature != PACK_SIGNATURE {
            return Err(corrupt_pack(&path, "missing PACK signature"));
        }

        let version = file.read_u32::<BigEndian>()?;
        if version != 2 && version != 3 {
            return Err(corrupt_pack(&path, format!("unsupported version {version}")));
        }
        let count = file.read_u32::<BigEndian>()? as usize;
        if count != index.len() {
            return Err(corrupt_pack(
                &path,
                format!("pack holds {count} objects, index lists {}", index.len()),
            ));
        }

        Ok(PackFile {
            path,
            index,
            algorithm,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn find_offset(&self, oid: &ObjectId) -> Option<u64> {
        self.index.lookup(oid)
    }

    /// Collect the delta chain for the entry at `offset` without applying it.
    ///
    /// Ofs-delta and in-pack ref-delta links are followed in a loop; a
    /// ref-delta whose base lives elsewhere ends the chain with
    /// [`ChainBase::External`] so the caller can continue in another store.
    pub fn read_chain(&self, oid: &ObjectId, offset: u64) -> Result<DeltaChain> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut deltas = Vec::new();
        let mut offset = offset;

        loop {
            if deltas.len() > MAX_DELTA_CHAIN {
                return Err(GitError::corrupt(oid, "delta chain too long"));
            }

            reader.seek(SeekFrom::Start(offset))?;
            let (code, size) = Self::read_entry_header(&mut reader)
                .map_err(|_| GitError::corrupt(oid, format!("bad entry header at {offset}")))?;

            let kind = match code {
                OFS_DELTA => {
                    let distance = Self::read_base_distance(&mut reader).map_err(|_| {
                        GitError::corrupt(oid, format!("bad delta base offset at {offset}"))
                    })?;
                    let base_offset = offset.checked_sub(distance).filter(|_| distance > 0);
                    EntryKind::OfsDelta(base_offset.ok_or_else(|| {
                        GitError::corrupt(oid, format!("delta base before pack start at {offset}"))
                    })?)
                }
                REF_DELTA => EntryKind::RefDelta(
                    ObjectId::read_raw_from(&mut reader, self.algorithm).map_err(|_| {
                        GitError::corrupt(oid, format!("truncated delta base id at {offset}"))
                    })?,
                ),
                code => EntryKind::Base(ObjectType::from_pack_code(code).ok_or_else(|| {
                    GitError::corrupt(oid, format!("invalid pack entry type {code}"))
                })?),
            };

            let data = Self::inflate(&mut reader, size)
                .map_err(|reason| GitError::corrupt(oid, reason))?;

            match kind {
                EntryKind::Base(object_type) => {
                    tracing::trace!(
                        pack = %self.path.display(),
                        %oid,
                        depth = deltas.len(),
                        "resolved pack entry"
                    );
                    return Ok(DeltaChain {
                        base: ChainBase::Object(RawObject::new(object_type, data)),
                        deltas,
                    });
                }
                EntryKind::OfsDelta(base_offset) => {
                    deltas.push(data);
                    offset = base_offset;
                }
                EntryKind::RefDelta(base) => {
                    deltas.push(data);
                    match self.index.lookup(&base) {
                        Some(base_offset) => offset = base_offset,
                        None => {
                            return Ok(DeltaChain {
                                base: ChainBase::External(base),
                                deltas,
                            });
                        }
                    }
                }
            }
        }
    }

    fn read_entry_header(reader: &mut impl Read) -> std::io::Result<(u8, usize)> {
        let mut byte = reader.read_u8()?;
        let code = (byte >> 4) & 0b111;
        let mut size = (byte & 0x0f) as usize;
        let mut shift = 4;

        while byte & 0x80 != 0 {
            if shift > usize::BITS - 7 {
                return Err(std::io::ErrorKind::InvalidData.into());
            }
            byte = reader.read_u8()?;
            size |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
        }

        Ok((code, size))
    }

    /// Big-endian base-128 distance with the "+1 per continuation" bias.
    fn read_base_distance(reader: &mut impl Read) -> std::io::Result<u64> {
        let mut byte = reader.read_u8()?;
        let mut distance = (byte & 0x7f) as u64;

        while byte & 0x80 != 0 {
            if distance > u64::MAX >> 8 {
                return Err(std::io::ErrorKind::InvalidData.into());
            }
            byte = reader.read_u8()?;
            distance = ((distance + 1) << 7) | (byte & 0x7f) as u64;
        }

        Ok(distance)
    }

    fn inflate(reader: &mut BufReader<File>, size: usize) -> std::result::Result<Bytes, String> {
        let mut decoder = flate2::bufread::ZlibDecoder::new(reader);
        let mut data = Vec::with_capacity(size.min(MAX_PREALLOCATION));
        decoder
            .by_ref()
            .take(size as u64 + 1)
            .read_to_end(&mut data)
            .map_err(|e| format!("bad zlib stream: {e}"))?;

        if data.len() != size {
            return Err(format!(
                "entry inflated to {} bytes, header says {size}",
                data.len()
            ));
        }

        Ok(data.into())
    }
}
