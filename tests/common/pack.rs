use flate2::Compression;
use flate2::write::ZlibEncoder;
use gitread::artifacts::objects::object_id::ObjectId;
use sha1::{Digest, Sha1};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::repo::TestRepo;

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

enum Encoding {
    Full,
    OfsDelta { base: usize, delta: Vec<u8> },
    RefDelta { base: ObjectId, delta: Vec<u8> },
    OfsDistance { distance: u64, delta: Vec<u8> },
    Header { code: u8, declared: usize },
}

struct PackEntry {
    oid: ObjectId,
    kind: &'static str,
    content: Vec<u8>,
    encoding: Encoding,
}

/// Writes a version 2 pack plus its version 2 index.
///
/// Delta entries are encoded as "copy the common prefix of the base, insert
/// the rest", which is enough to exercise every kind of chain.
#[derive(Default)]
pub struct PackBuilder {
    entries: Vec<PackEntry>,
}

fn type_code(kind: &str) -> u8 {
    match kind {
        "commit" => 1,
        "tree" => 2,
        "blob" => 3,
        other => panic!("unsupported pack type {other}"),
    }
}

fn write_size(out: &mut Vec<u8>, mut size: usize) {
    loop {
        let byte = (size & 0x7f) as u8;
        size >>= 7;
        if size == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Delta turning `base` into `target`.
pub fn make_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    write_size(&mut delta, base.len());
    write_size(&mut delta, target.len());

    let prefix = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xffff);
    if prefix > 0 {
        let mut op = 0x80u8;
        let mut size_bytes = Vec::new();
        for i in 0..3 {
            let byte = ((prefix >> (8 * i)) & 0xff) as u8;
            if byte != 0 {
                op |= 1 << (4 + i);
                size_bytes.push(byte);
            }
        }
        delta.push(op);
        delta.extend(size_bytes);
    }

    for chunk in target[prefix..].chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }

    delta
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("compress");
    encoder.finish().expect("compress")
}

fn entry_header(out: &mut Vec<u8>, code: u8, size: usize) {
    let mut byte = (code << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    while rest != 0 {
        out.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    out.push(byte);
}

fn ofs_distance(out: &mut Vec<u8>, distance: u64) {
    let mut n = distance;
    let mut bytes = vec![(n & 0x7f) as u8];
    n >>= 7;
    while n != 0 {
        n -= 1;
        bytes.push(0x80 | (n & 0x7f) as u8);
        n >>= 7;
    }
    bytes.reverse();
    out.extend(bytes);
}

impl PackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: &'static str, content: &[u8], encoding: Encoding) -> ObjectId {
        let oid = TestRepo::object_id(kind, content);
        self.entries.push(PackEntry {
            oid: oid.clone(),
            kind,
            content: content.to_vec(),
            encoding,
        });
        oid
    }

    /// Index of the entry holding `oid`
    pub fn position(&self, oid: &ObjectId) -> usize {
        self.entries
            .iter()
            .position(|entry| &entry.oid == oid)
            .expect("entry is in this pack")
    }

    pub fn add_full(&mut self, kind: &'static str, content: &[u8]) -> ObjectId {
        self.push(kind, content, Encoding::Full)
    }

    /// Store `target` as an ofs-delta against an earlier entry of this pack.
    pub fn add_ofs_delta(&mut self, base: &ObjectId, target: &[u8]) -> ObjectId {
        let base = self.position(base);
        let kind = self.entries[base].kind;
        let delta = make_delta(&self.entries[base].content, target);
        self.push(kind, target, Encoding::OfsDelta { base, delta })
    }

    /// Store `target` as a ref-delta against an entry of this pack.
    pub fn add_ref_delta(&mut self, base: &ObjectId, target: &[u8]) -> ObjectId {
        let position = self.position(base);
        let kind = self.entries[position].kind;
        let delta = make_delta(&self.entries[position].content, target);
        self.push(
            kind,
            target,
            Encoding::RefDelta {
                base: base.clone(),
                delta,
            },
        )
    }

    /// Store `target` as a ref-delta against an object kept outside this pack.
    pub fn add_external_ref_delta(
        &mut self,
        kind: &'static str,
        base: &ObjectId,
        base_content: &[u8],
        target: &[u8],
    ) -> ObjectId {
        let delta = make_delta(base_content, target);
        self.push(
            kind,
            target,
            Encoding::RefDelta {
                base: base.clone(),
                delta,
            },
        )
    }

    /// Store `target` under a hand-written delta against `base`.
    pub fn add_ref_delta_bytes(
        &mut self,
        kind: &'static str,
        base: &ObjectId,
        target: &[u8],
        delta: Vec<u8>,
    ) -> ObjectId {
        self.push(
            kind,
            target,
            Encoding::RefDelta {
                base: base.clone(),
                delta,
            },
        )
    }

    /// Store `target` as an ofs-delta against an empty base said to sit
    /// `distance` bytes before the entry.
    pub fn add_ofs_delta_at(&mut self, kind: &'static str, target: &[u8], distance: u64) -> ObjectId {
        let delta = make_delta(b"", target);
        self.push(kind, target, Encoding::OfsDistance { distance, delta })
    }

    /// Store `content` with a hand-picked type code and declared size.
    pub fn add_with_header(
        &mut self,
        kind: &'static str,
        content: &[u8],
        code: u8,
        declared: usize,
    ) -> ObjectId {
        self.push(kind, content, Encoding::Header { code, declared })
    }

    /// Write `pack-<checksum>.pack` and `.idx` into `pack_dir`, returning the
    /// index path.
    pub fn write_to(&self, pack_dir: &Path) -> PathBuf {
        let mut pack = b"PACK".to_vec();
        pack.extend(2u32.to_be_bytes());
        pack.extend((self.entries.len() as u32).to_be_bytes());

        let mut offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let offset = pack.len() as u64;
            offsets.push(offset);

            match &entry.encoding {
                Encoding::Full => {
                    entry_header(&mut pack, type_code(entry.kind), entry.content.len());
                    pack.extend(compress(&entry.content));
                }
                Encoding::OfsDelta { base, delta } => {
                    entry_header(&mut pack, OFS_DELTA, delta.len());
                    ofs_distance(&mut pack, offset - offsets[*base]);
                    pack.extend(compress(delta));
                }
                Encoding::RefDelta { base, delta } => {
                    entry_header(&mut pack, REF_DELTA, delta.len());
                    pack.extend(base.as_bytes());
                    pack.extend(compress(delta));
                }
                Encoding::OfsDistance { distance, delta } => {
                    entry_header(&mut pack, OFS_DELTA, delta.len());
                    ofs_distance(&mut pack, *distance);
                    pack.extend(compress(delta));
                }
                Encoding::Header { code, declared } => {
                    entry_header(&mut pack, *code, *declared);
                    pack.extend(compress(&entry.content));
                }
            }
        }
        let checksum = Sha1::digest(&pack);
        pack.extend_from_slice(&checksum);

        let name = checksum
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>();
        std::fs::create_dir_all(pack_dir).expect("pack dir");
        let pack_path = pack_dir.join(format!("pack-{name}.pack"));
        let index_path = pack_dir.join(format!("pack-{name}.idx"));
        std::fs::write(&pack_path, &pack).expect("pack file");
        std::fs::write(&index_path, self.index(&offsets, &checksum)).expect("index file");

        index_path
    }

    fn index(&self, offsets: &[u64], pack_checksum: &[u8]) -> Vec<u8> {
        let mut sorted = self
            .entries
            .iter()
            .zip(offsets)
            .map(|(entry, offset)| (entry.oid.clone(), *offset))
            .collect::<Vec<_>>();
        sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut index = vec![0xff, b't', b'O', b'c'];
        index.extend(2u32.to_be_bytes());
        for byte in 0..=255u8 {
            let count = sorted
                .iter()
                .filter(|(oid, _)| oid.as_bytes()[0] <= byte)
                .count() as u32;
            index.extend(count.to_be_bytes());
        }
        sorted.iter().for_each(|(oid, _)| index.extend(oid.as_bytes()));
        sorted.iter().for_each(|_| index.extend(0u32.to_be_bytes()));
        sorted
            .iter()
            .for_each(|(_, offset)| index.extend((*offset as u32).to_be_bytes()));
        index.extend_from_slice(pack_checksum);
        let checksum = Sha1::digest(&index);
        index.extend_from_slice(&checksum);

        index
    }
}
