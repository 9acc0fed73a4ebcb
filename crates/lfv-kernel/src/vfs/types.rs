//! Core VFS types.
//!
//! These are the values handed to callers and serialized over HTTP, so the
//! serde shape matches what the browser client reads (`isDirectory`, etc.).

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (only reported when it cannot be followed).
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// File attributes (cached stat result).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644). Zero where unsupported.
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
}

impl FileAttr {
    /// Convert std::fs::Metadata to FileAttr.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let kind = if meta.is_dir() {
            FileType::Directory
        } else if meta.file_type().is_symlink() {
            FileType::Symlink
        } else {
            FileType::File
        };

        #[cfg(unix)]
        let perm = meta.permissions().mode();
        #[cfg(not(unix))]
        let perm = 0;

        Self {
            size: meta.len(),
            kind,
            perm,
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        }
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// A node in a walked directory tree.
///
/// `children` is only present on directories whose level was expanded;
/// directories past the requested depth are reported with `children: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkDirItem {
    pub name: String,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WalkDirItem>>,
}

impl WalkDirItem {
    /// A leaf file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            children: None,
        }
    }

    /// A directory entry whose children have not been listed.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            children: None,
        }
    }

    /// Children of this node, empty for files and unexpanded directories.
    pub fn children(&self) -> &[WalkDirItem] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&WalkDirItem> {
        self.children().iter().find(|c| c.name == name)
    }
}

/// How file content is decoded before it is cached and returned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::EnumString,
    strum::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Encoding {
    /// Lossy UTF-8 text.
    #[default]
    #[serde(rename = "utf-8")]
    #[strum(to_string = "utf-8", serialize = "utf8")]
    Utf8,
    /// Standard base64 of the raw bytes.
    #[serde(rename = "base64")]
    #[strum(to_string = "base64")]
    Base64,
    /// Raw bytes, no decoding.
    #[serde(rename = "raw")]
    #[strum(to_string = "raw", serialize = "binary")]
    Raw,
}

/// Decoded file content held in the content cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    Text(String),
    Bytes(Vec<u8>),
}

impl FileData {
    /// Decode raw bytes according to `encoding`.
    pub fn decode(bytes: Vec<u8>, encoding: Encoding) -> Self {
        use base64::Engine as _;

        match encoding {
            Encoding::Utf8 => match String::from_utf8(bytes) {
                Ok(s) => FileData::Text(s),
                Err(e) => FileData::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            },
            Encoding::Base64 => {
                FileData::Text(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Encoding::Raw => FileData::Bytes(bytes),
        }
    }

    /// Text view, if this was decoded as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileData::Text(s) => Some(s),
            FileData::Bytes(_) => None,
        }
    }

    /// Byte view of the cached value.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileData::Text(s) => s.as_bytes(),
            FileData::Bytes(b) => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_item_serialization() {
        let mut dir = WalkDirItem::directory("src");
        dir.children = Some(vec![WalkDirItem::file("main.rs"), WalkDirItem::directory("bin")]);

        let json = serde_json::to_value(&dir).unwrap();
        assert_eq!(json["isDirectory"], true);
        assert_eq!(json["children"][0]["name"], "main.rs");
        // unexpanded dirs and files carry no children key at all
        assert!(json["children"][0].get("children").is_none());
        assert!(json["children"][1].get("children").is_none());
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("UTF8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("base64".parse::<Encoding>().unwrap(), Encoding::Base64);
        assert_eq!("raw".parse::<Encoding>().unwrap(), Encoding::Raw);
        assert!("latin1".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_file_data_decode() {
        let text = FileData::decode(b"hi\n".to_vec(), Encoding::Utf8);
        assert_eq!(text.as_text(), Some("hi\n"));

        let b64 = FileData::decode(b"hi".to_vec(), Encoding::Base64);
        assert_eq!(b64.as_text(), Some("aGk="));

        let raw = FileData::decode(vec![0xff, 0x00], Encoding::Raw);
        assert_eq!(raw.as_bytes(), &[0xff, 0x00]);
        assert_eq!(raw.as_text(), None);

        let lossy = FileData::decode(vec![b'a', 0xff], Encoding::Utf8);
        assert_eq!(lossy.as_text(), Some("a\u{fffd}"));
    }
}
