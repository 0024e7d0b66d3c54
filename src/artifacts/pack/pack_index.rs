//! Pack index (`.idx`) reader
//!
//! Maps object ids to byte offsets in the companion `.pack` file. Ids are
//! sorted, and a 256-entry fanout table gives, for every first byte, how many
//! ids start with a byte less than or equal to it, so a lookup is a binary
//! search over a single fanout bucket.
//!
//! ## Version 2 layout
//!
//! ```text
//! \xfftOc | version=2 | fanout[256] | ids[n] | crc32[n] | offset32[n] | offset64[k] | trailer
//! ```
//!
//! A 32-bit offset with its high bit set indexes into the 64-bit table.
//!
//! ## Version 1 layout
//!
//! ```text
//! fanout[256] | (offset32, id)[n] | trailer
//! ```

use crate::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use byteorder::{BigEndian, ByteOrder};

const V2_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const FANOUT_ENTRIES: usize = 256;
const FANOUT_SIZE: usize = FANOUT_ENTRIES * 4;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone)]
pub struct PackIndex {
    fanout: Vec<u32>,
    ids: Vec<ObjectId>,
    offsets: Vec<u64>,
}

fn slice(data: &[u8], start: usize, len: usize) -> Result<&[u8], String> {
    data.get(start..start + len)
        .ok_or_else(|| format!("index truncated at byte {start}"))
}

fn read_fanout(data: &[u8]) -> Result<Vec<u32>, String> {
    let fanout = (0..FANOUT_ENTRIES)
        .map(|i| BigEndian::read_u32(&data[i * 4..i * 4 + 4]))
        .collect::<Vec<_>>();

    if fanout.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err("fanout table is not monotonic".to_string());
    }

    Ok(fanout)
}

impl PackIndex {
    pub fn parse(data: &[u8], algorithm: HashAlgorithm) -> Result<Self, String> {
        if data.starts_with(&V2_MAGIC) {
            let version = BigEndian::read_u32(slice(data, 4, 4)?);
            if version != 2 {
                return Err(format!("unsupported index version {version}"));
            }
            Self::parse_v2(data, algorithm)
        } else {
            Self::parse_v1(data, algorithm)
        }
    }

    fn parse_v2(data: &[u8], algorithm: HashAlgorithm) -> Result<Self, String> {
        let hash_len = algorithm.raw_len();
        let fanout = read_fanout(slice(data, 8, FANOUT_SIZE)?)?;
        let count = fanout[FANOUT_ENTRIES - 1] as usize;

        let ids_start = 8 + FANOUT_SIZE;
        let crc_start = ids_start + count * hash_len;
        let offsets_start = crc_start + count * 4;
        let large_start = offsets_start + count * 4;

        let ids = slice(data, ids_start, count * hash_len)?
            .chunks_exact(hash_len)
            .map(|raw| ObjectId::from_raw(raw).map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let offsets = slice(data, offsets_start, count * 4)?
            .chunks_exact(4)
            .map(|raw| -> Result<u64, String> {
                let offset = BigEndian::read_u32(raw);
                if offset & LARGE_OFFSET_FLAG == 0 {
                    return Ok(offset as u64);
                }

                let large_index = (offset & !LARGE_OFFSET_FLAG) as usize;
                Ok(BigEndian::read_u64(slice(
                    data,
                    large_start + large_index * 8,
                    8,
                )?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PackIndex {
            fanout,
            ids,
            offsets,
        })
    }

    fn parse_v1(data: &[u8], algorithm: HashAlgorithm) -> Result<Self, String> {
        let hash_len = algorithm.raw_len();
        let fanout = read_fanout(slice(data, 0, FANOUT_SIZE)?)?;
        let count = fanout[FANOUT_ENTRIES - 1] as usize;
        let record_len = 4 + hash_len;

        let (offsets, ids) = slice(data, FANOUT_SIZE, count * record_len)?
            .chunks_exact(record_len)
            .map(|record| -> Result<(u64, ObjectId), String> {
                let offset = BigEndian::read_u32(&record[..4]) as u64;
                let oid = ObjectId::from_raw(&record[4..]).map_err(|e| e.to_string())?;
                Ok((offset, oid))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        Ok(PackIndex {
            fanout,
            ids,
            offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Byte offset of `oid` in the pack, if this pack holds it
    pub fn lookup(&self, oid: &ObjectId) -> Option<u64> {
        let first = *oid.as_bytes().first()? as usize;
        let start = if first == 0 {
            0
        } else {
            self.fanout[first - 1] as usize
        };
        let end = self.fanout[first] as usize;

        let bucket = self.ids.get(start..end)?;
        bucket
            .binary_search_by(|probe| probe.as_bytes().cmp(oid.as_bytes()))
            .ok()
            .map(|position| self.offsets[start + position])
    }
}
