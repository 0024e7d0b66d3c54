use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{GitError, Result};
use bytes::Bytes;
use derive_new::new;
use std::sync::Arc;

/// Decode an object payload (the bytes after the `<type> <size>\0` header).
pub trait Unpackable {
    fn deserialize(oid: &ObjectId, payload: Bytes) -> Result<Self>
    where
        Self: Sized;
}

/// Undecoded object: its storage type plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct RawObject {
    pub object_type: ObjectType,
    pub payload: Bytes,
}

impl RawObject {
    /// Split a decompressed loose object into its header and payload.
    pub fn parse_loose(oid: &ObjectId, content: Bytes) -> Result<Self> {
        let space = content
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| GitError::corrupt(oid, "malformed header: missing type"))?;
        let nul = content
            .iter()
            .position(|&b| b == b'\0')
            .filter(|&nul| nul > space)
            .ok_or_else(|| GitError::corrupt(oid, "malformed header: missing size"))?;

        let object_type = ObjectType::try_from(&content[..space])
            .map_err(|reason| GitError::corrupt(oid, reason))?;
        let size = std::str::from_utf8(&content[space + 1..nul])
            .ok()
            .and_then(|size| size.parse::<usize>().ok())
            .ok_or_else(|| GitError::corrupt(oid, "malformed header: invalid size"))?;

        let payload = content.slice(nul + 1..);
        if payload.len() != size {
            return Err(GitError::corrupt(
                oid,
                format!(
                    "size mismatch: header says {size}, payload has {}",
                    payload.len()
                ),
            ));
        }

        Ok(RawObject::new(object_type, payload))
    }

    /// Hash the canonical serialized form with the id's algorithm.
    pub fn compute_id(&self, template: &ObjectId) -> ObjectId {
        let header = format!("{} {}\0", self.object_type.as_str(), self.payload.len());
        template
            .algorithm()
            .digest(&[header.as_bytes(), &self.payload[..]])
    }

    /// Fail with `CorruptObject` unless the content hashes to `oid`.
    pub fn verify(&self, oid: &ObjectId) -> Result<()> {
        let computed = self.compute_id(oid);
        if &computed != oid {
            return Err(GitError::corrupt(
                oid,
                format!("hash mismatch: content hashes to {computed}"),
            ));
        }

        Ok(())
    }

    pub fn decode(self, oid: &ObjectId) -> Result<Object> {
        match self.object_type {
            ObjectType::Commit => Ok(Object::Commit(Arc::new(Commit::deserialize(
                oid,
                self.payload,
            )?))),
            ObjectType::Tree => Ok(Object::Tree(Arc::new(Tree::deserialize(
                oid,
                self.payload,
            )?))),
            ObjectType::Blob => Ok(Object::Blob(Arc::new(Blob::deserialize(
                oid,
                self.payload,
            )?))),
            ObjectType::Tag => Err(GitError::corrupt(oid, "unexpected object type tag")),
        }
    }
}

/// A decoded object, shared with the store's query-scoped cache.
#[derive(Debug, Clone)]
pub enum Object {
    Commit(Arc<Commit>),
    Tree(Arc<Tree>),
    Blob(Arc<Blob>),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Commit(_) => ObjectType::Commit,
            Object::Tree(_) => ObjectType::Tree,
            Object::Blob(_) => ObjectType::Blob,
        }
    }
}
