//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file data,
//! without any metadata like filename or permissions (those are stored in trees).

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;
use bytes::Bytes;
use derive_new::new;

/// How far into a blob git looks for a NUL byte before calling it binary
const BINARY_PROBE_LENGTH: usize = 8000;

/// Raw file content at one commit
#[derive(Debug, Clone, PartialEq, Eq, Default, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    /// Content as a cheaply cloneable byte buffer
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_binary(&self) -> bool {
        self.content
            .iter()
            .take(BINARY_PROBE_LENGTH)
            .any(|&byte| byte == b'\0')
    }
}

impl Unpackable for Blob {
    fn deserialize(_oid: &ObjectId, payload: Bytes) -> Result<Self> {
        Ok(Self::new(payload))
    }
}
