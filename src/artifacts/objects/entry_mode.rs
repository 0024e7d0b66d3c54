use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
    Symlink,
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Directory,
    /// Submodule commit pointer
    Gitlink,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::File(FileMode::Symlink) => "120000",
            EntryMode::Directory => "40000",
            EntryMode::Gitlink => "160000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::File(FileMode::Symlink) => 0o120000,
            EntryMode::Directory => 0o40000,
            EntryMode::Gitlink => 0o160000,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, EntryMode::File(_))
    }

    /// Parse the octal mode written in tree entries.
    ///
    /// Old repositories may carry `100664` or other group-writable variants;
    /// git treats any `100xxx` as a regular file unless the owner execute bit
    /// is set.
    pub fn from_octal_str(value: &str) -> Option<Self> {
        let mode = u32::from_str_radix(value, 8).ok()?;

        match mode & 0o170000 {
            0o100000 if mode & 0o100 != 0 => Some(EntryMode::File(FileMode::Executable)),
            0o100000 => Some(EntryMode::File(FileMode::Regular)),
            0o120000 => Some(EntryMode::File(FileMode::Symlink)),
            0o040000 => Some(EntryMode::Directory),
            0o160000 => Some(EntryMode::Gitlink),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.as_u32())
    }
}

impl Serialize for EntryMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
